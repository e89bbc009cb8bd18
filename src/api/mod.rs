/// 接口文档
/// OpenAPI document for the HTTP surface
pub mod openapi;

pub use openapi::ApiDoc;
