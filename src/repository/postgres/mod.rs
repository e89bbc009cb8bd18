//! PostgreSQL 存储实现
//! PostgreSQL-backed stores

pub mod access_tokens;
pub mod github_webhooks;
pub mod roles;
pub mod users;

pub use access_tokens::PgAccessTokensRepository;
pub use github_webhooks::PgGithubWebhooksRepository;
pub use roles::PgRolesRepository;
pub use users::PgUsersRepository;

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::error::Result;
use crate::conf::PostgresConfig;
use crate::modules::users::models::{Permission, Role, User};

/// 连接器：持有连接池
pub struct Connector {
    pool: PgPool,
}

impl Connector {
    /// 建立连接池，失败时按指数退避重试
    ///
    /// Tries `connection_retries` times (at least once), waiting 1s, 2s, 4s... between
    /// attempts.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let attempts = config.connection_retries.max(1);
        let mut attempt = 1;

        loop {
            match Self::try_connect(config).await {
                Ok(pool) => {
                    info!(
                        host = %config.host,
                        database = %config.database,
                        attempt,
                        "postgres pool ready"
                    );
                    return Ok(Self { pool });
                }
                Err(e) if attempt < attempts => {
                    let delay = backoff_delay(attempt);
                    warn!(
                        attempt,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "postgres connection failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn try_connect(config: &PostgresConfig) -> std::result::Result<PgPool, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .idle_timeout(Some(Duration::from_secs(300)))
            .connect_with(connect_options(config))
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(pool)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 执行内嵌的迁移脚本
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("migrations applied");
        Ok(())
    }
}

pub fn connect_options(config: &PostgresConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database)
        .options([("search_path", config.schema.as_str())])
}

/// 第 n 次失败后的等待时间
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(1000 * 2u64.pow(attempt.saturating_sub(1).min(6)))
}

/// 用户-角色-权限左连接后的一行
/// One row of the users ⟕ roles ⟕ permissions join
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserGraphRow {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub role_id: Option<Uuid>,
    pub role_name: Option<String>,
    pub permission_id: Option<Uuid>,
    pub permission_name: Option<String>,
}

pub(crate) const USER_GRAPH_COLUMNS: &str = "u.id AS user_id, u.email, u.first_name, u.last_name, u.password, \
     r.id AS role_id, r.name AS role_name, p.id AS permission_id, p.name AS permission_name";

pub(crate) const USER_GRAPH_JOINS: &str = "LEFT JOIN user_roles ur ON ur.user_id = u.id \
     LEFT JOIN roles r ON r.id = ur.role_id \
     LEFT JOIN roles_permissions rp ON rp.role_id = r.id \
     LEFT JOIN permissions p ON p.id = rp.permission_id";

/// 将连接查询的多行折叠为一个用户
///
/// Rows must all belong to the same user. Role order follows first appearance.
pub fn fold_user(rows: &[UserGraphRow]) -> Option<User> {
    let first = rows.first()?;
    let mut roles: Vec<Role> = Vec::new();

    for row in rows {
        let (Some(role_id), Some(role_name)) = (row.role_id, row.role_name.as_ref()) else {
            continue;
        };

        let idx = match roles.iter().position(|r| r.id == role_id) {
            Some(idx) => idx,
            None => {
                roles.push(Role {
                    id: role_id,
                    name: role_name.clone(),
                    permissions: Vec::new(),
                });
                roles.len() - 1
            }
        };

        if let (Some(pid), Some(pname)) = (row.permission_id, row.permission_name.as_ref()) {
            let role = &mut roles[idx];
            if !role.permissions.iter().any(|p| p.id == pid) {
                role.permissions.push(Permission {
                    id: pid,
                    name: pname.clone(),
                });
            }
        }
    }

    Some(User {
        id: first.user_id,
        email: first.email.clone(),
        first_name: first.first_name.clone(),
        last_name: first.last_name.clone(),
        password_hash: first.password.clone(),
        roles,
    })
}
