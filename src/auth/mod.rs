//! 请求鉴权：令牌校验与权限范围判定
//! Request authorization: credential checks and scope decisions

pub mod gate;
pub mod scopes;

pub use gate::{Access, AuthenticatedUser, AuthorizationGate};
pub use scopes::RequiredScopes;

/// 访问令牌 ID 请求头
pub const ACCESS_KEY_ID_HEADER: &str = "X-Access-Key-ID";

/// 访问令牌密钥请求头
pub const ACCESS_KEY_TOKEN_HEADER: &str = "X-Access-Key-Token";
