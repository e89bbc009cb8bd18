use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::modules::ingestion::GithubWebhooksRepo;
use crate::repository::error::{Result, StoreError};

pub struct PgGithubWebhooksRepository {
    pool: PgPool,
}

impl PgGithubWebhooksRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GithubWebhooksRepo for PgGithubWebhooksRepository {
    async fn create(&self, id: Uuid, occurred_at: DateTime<Utc>, payload: &Value) -> Result<()> {
        sqlx::query("INSERT INTO github_webhooks (id, occurred_at, payload) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(occurred_at)
            .bind(Json(payload))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_insert(e, &id.to_string()))?;

        Ok(())
    }
}
