//! 内存存储：本地开发驱动与测试夹具
//! In-memory store used by the `memory` driver and by tests

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use super::error::{Result, StoreError};
use crate::modules::ingestion::GithubWebhooksRepo;
use crate::modules::users::models::{AccessToken, AccessTokenRecord, Role, User, SUPERUSER_ROLE};
use crate::modules::users::repo::{AccessTokensRepo, RolesRepo, UsersRepo, USERS_EMAIL_KEY};

#[derive(Debug, Clone)]
pub struct StoredWebhook {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub payload: Value,
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    roles: HashMap<String, Role>,
    tokens: HashMap<String, AccessTokenRecord>,
    webhooks: Vec<StoredWebhook>,
}

/// All tables sit behind one lock so every write is visible to the next read.
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// 创建并预置 superuser 角色
    pub fn new() -> Self {
        let store = Self {
            tables: RwLock::new(Tables::default()),
        };
        store.insert_role(Role::new(SUPERUSER_ROLE));
        store
    }

    pub fn insert_role(&self, role: Role) {
        self.tables.write().roles.insert(role.name.clone(), role);
    }

    pub fn token_count(&self) -> usize {
        self.tables.read().tokens.len()
    }

    pub fn webhooks(&self) -> Vec<StoredWebhook> {
        self.tables.read().webhooks.clone()
    }

    /// Drops the user and, like the Postgres foreign key, every token it owns.
    pub fn delete_user(&self, id: Uuid) {
        let mut tables = self.tables.write();
        tables.users.remove(&id);
        tables.tokens.retain(|_, t| t.user_id != id);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UsersRepo for MemoryStore {
    async fn get(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    async fn by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .tables
            .read()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create(&self, user: &User) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.users.contains_key(&user.id) {
            return Err(StoreError::Collision {
                id: user.id.to_string(),
            });
        }
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate {
                constraint: USERS_EMAIL_KEY.to_string(),
            });
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }
}

#[async_trait]
impl RolesRepo for MemoryStore {
    async fn by_names(&self, names: &[String]) -> Result<Vec<Role>> {
        let tables = self.tables.read();
        Ok(names
            .iter()
            .filter_map(|name| tables.roles.get(name).cloned())
            .collect())
    }
}

#[async_trait]
impl AccessTokensRepo for MemoryStore {
    async fn by_id(&self, id: &str) -> Result<Option<AccessToken>> {
        let tables = self.tables.read();
        let Some(record) = tables.tokens.get(id) else {
            return Ok(None);
        };
        let Some(user) = tables.users.get(&record.user_id) else {
            return Ok(None);
        };

        Ok(Some(AccessToken {
            id: record.id.clone(),
            secret: None,
            secret_hash: record.secret_hash.clone(),
            expire_at: record.expires_at,
            user: user.clone(),
        }))
    }

    async fn create(&self, record: &AccessTokenRecord) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.tokens.contains_key(&record.id) {
            return Err(StoreError::Collision {
                id: record.id.clone(),
            });
        }
        tables.tokens.insert(record.id.clone(), record.clone());
        Ok(())
    }
}

#[async_trait]
impl GithubWebhooksRepo for MemoryStore {
    async fn create(&self, id: Uuid, occurred_at: DateTime<Utc>, payload: &Value) -> Result<()> {
        self.tables.write().webhooks.push(StoredWebhook {
            id,
            occurred_at,
            payload: payload.clone(),
        });
        Ok(())
    }
}
