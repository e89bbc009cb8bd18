/// 用户模块
/// 用户、角色、访问令牌
pub mod access_tokens;
pub mod cmd;
pub mod models;
pub mod repo;
pub mod routes;
pub mod service;

pub use access_tokens::{AccessTokensConfig, AccessTokensService, TokenDefinition};
pub use cmd::UsersCommands;
pub use service::{CreateUser, UsersService};
