pub mod auth;
pub mod debug_errors;
pub mod request_id;

pub use auth::RequireScopes;
pub use debug_errors::debug_errors;
pub use request_id::{RequestId, RequestIdMiddleware};
