use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{fold_user, UserGraphRow, USER_GRAPH_COLUMNS, USER_GRAPH_JOINS};
use crate::modules::users::models::{AccessToken, AccessTokenRecord};
use crate::modules::users::repo::AccessTokensRepo;
use crate::repository::error::{Result, StoreError};

#[derive(Debug, sqlx::FromRow)]
struct TokenGraphRow {
    token_id: String,
    secret: String,
    expires_at: Option<DateTime<Utc>>,
    #[sqlx(flatten)]
    user: UserGraphRow,
}

pub struct PgAccessTokensRepository {
    pool: PgPool,
}

impl PgAccessTokensRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessTokensRepo for PgAccessTokensRepository {
    async fn by_id(&self, id: &str) -> Result<Option<AccessToken>> {
        let sql = format!(
            "SELECT t.id AS token_id, t.secret, t.expires_at, {} \
             FROM user_access_tokens t \
             JOIN users u ON u.id = t.user_id \
             {} \
             WHERE t.id = $1",
            USER_GRAPH_COLUMNS, USER_GRAPH_JOINS
        );
        let rows: Vec<TokenGraphRow> = sqlx::query_as(&sql).bind(id).fetch_all(&self.pool).await?;

        let Some(first) = rows.first() else {
            return Ok(None);
        };
        let users: Vec<UserGraphRow> = rows.iter().map(|r| r.user.clone()).collect();
        let Some(user) = fold_user(&users) else {
            return Ok(None);
        };

        Ok(Some(AccessToken {
            id: first.token_id.clone(),
            secret: None,
            secret_hash: first.secret.clone(),
            expire_at: first.expires_at,
            user,
        }))
    }

    async fn create(&self, record: &AccessTokenRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO user_access_tokens (id, user_id, secret, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&record.id)
        .bind(record.user_id)
        .bind(&record.secret_hash)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_insert(e, &record.id))?;

        Ok(())
    }
}
