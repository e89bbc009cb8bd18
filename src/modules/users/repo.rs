//! 用户模块依赖的存储契约
//! Storage contracts consumed by the users module. Implementations live in
//! `crate::repository`.

use async_trait::async_trait;
use uuid::Uuid;

use super::models::{AccessToken, AccessTokenRecord, Role, User};
use crate::repository::error::Result;

/// 邮箱唯一约束名
/// Name of the unique constraint on `users.email`
pub const USERS_EMAIL_KEY: &str = "users_email_key";

/// 用户目录
#[async_trait]
pub trait UsersRepo: Send + Sync {
    /// `Ok(None)` when no user has this ID.
    async fn get(&self, id: Uuid) -> Result<Option<User>>;

    async fn by_email(&self, email: &str) -> Result<Option<User>>;

    /// Inserts the user together with its role links. A taken email is reported as
    /// `StoreError::Duplicate` naming [`USERS_EMAIL_KEY`].
    async fn create(&self, user: &User) -> Result<()>;
}

#[async_trait]
pub trait RolesRepo: Send + Sync {
    /// Returns only the roles that exist; callers compare lengths to spot unknown names.
    async fn by_names(&self, names: &[String]) -> Result<Vec<Role>>;
}

/// 访问令牌存储
#[async_trait]
pub trait AccessTokensRepo: Send + Sync {
    /// Absence is `Ok(None)`, never an error. The token carries its owner with roles and
    /// permissions resolved.
    async fn by_id(&self, id: &str) -> Result<Option<AccessToken>>;

    /// Must report a taken ID as `StoreError::Collision`.
    async fn create(&self, record: &AccessTokenRecord) -> Result<()>;
}
