use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::RequiredScopes;

/// 拥有全部权限的角色名
/// Role that currently grants blanket authorization
pub const SUPERUSER_ROLE: &str = "superuser";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Permission {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            permissions: Vec::new(),
        }
    }

    pub fn with_permission(mut self, name: impl Into<String>) -> Self {
        self.permissions.push(Permission {
            id: Uuid::new_v4(),
            name: name.into(),
        });
        self
    }

    /// Exact name match against the role's permissions. Not consulted by
    /// [`User::can`] yet.
    pub fn grants(&self, scope: &str) -> bool {
        self.permissions.iter().any(|p| p.name == scope)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

impl User {
    pub fn has_role(&self, search: &str) -> bool {
        self.roles.iter().any(|role| role.name == search)
    }

    /// 判断用户是否满足路由要求的权限范围
    ///
    /// Superusers may do anything; every other role is denied regardless of the
    /// permissions it lists.
    pub fn can(&self, _scopes: &RequiredScopes) -> bool {
        self.has_role(SUPERUSER_ROLE)
    }
}

/// 访问令牌
///
/// `secret` carries the plaintext only on the value returned at creation time; a token
/// loaded from a store never has it.
#[derive(Clone)]
pub struct AccessToken {
    pub id: String,
    pub secret: Option<String>,
    pub secret_hash: String,
    pub expire_at: Option<DateTime<Utc>>,
    pub user: User,
}

impl AccessToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expire_at, Some(expire_at) if expire_at <= now)
    }

    /// 持久化形态，不包含明文密钥
    pub fn record(&self) -> AccessTokenRecord {
        AccessTokenRecord {
            id: self.id.clone(),
            user_id: self.user.id,
            secret_hash: self.secret_hash.clone(),
            expires_at: self.expire_at,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("id", &self.id)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("secret_hash", &self.secret_hash)
            .field("expire_at", &self.expire_at)
            .field("user_id", &self.user.id)
            .finish()
    }
}

/// 令牌在存储边界上的记录形态
/// Token shape at the store boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenRecord {
    pub id: String,
    pub user_id: Uuid,
    pub secret_hash: String,
    pub expires_at: Option<DateTime<Utc>>,
}
