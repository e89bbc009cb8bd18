//! GitHub webhook 采集
//! GitHub webhook ingestion

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::comm::{Clock, SystemClock};
use crate::error::AppResult;
use crate::repository::error::Result;

#[async_trait]
pub trait GithubWebhooksRepo: Send + Sync {
    async fn create(&self, id: Uuid, occurred_at: DateTime<Utc>, payload: &Value) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct GithubEvent {
    pub event: String,
    pub delivery_id: String,
    pub payload: Value,
}

pub struct GithubIngestor {
    repo: Arc<dyn GithubWebhooksRepo>,
    clock: Arc<dyn Clock>,
}

impl GithubIngestor {
    pub fn new(repo: Arc<dyn GithubWebhooksRepo>) -> Self {
        Self {
            repo,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 保存事件负载，返回生成的记录 ID
    #[instrument(skip(self, e), fields(event = %e.event, delivery_id = %e.delivery_id))]
    pub async fn process(&self, e: GithubEvent) -> AppResult<Uuid> {
        let id = Uuid::new_v4();
        self.repo.create(id, self.clock.now(), &e.payload).await?;

        debug!(webhook_id = %id, "github event stored");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::FixedClock;
    use crate::error::ErrorKind;
    use crate::repository::{MemoryStore, StoreError};
    use chrono::TimeZone;
    use serde_json::json;

    #[tokio::test]
    async fn test_process_stores_payload_with_clock_time() {
        let store = Arc::new(MemoryStore::new());
        let at = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap();
        let ingestor = GithubIngestor::new(store.clone()).with_clock(Arc::new(FixedClock(at)));

        let id = ingestor
            .process(GithubEvent {
                event: "push".to_string(),
                delivery_id: "72d3162e-cc78-11e3-81ab-4c9367dc0958".to_string(),
                payload: json!({"ref": "refs/heads/main", "commits": []}),
            })
            .await
            .unwrap();

        let stored = store.webhooks();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, id);
        assert_eq!(stored[0].occurred_at, at);
        assert_eq!(stored[0].payload["ref"], "refs/heads/main");
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        struct Broken;

        #[async_trait]
        impl GithubWebhooksRepo for Broken {
            async fn create(&self, _: Uuid, _: DateTime<Utc>, _: &Value) -> Result<()> {
                Err(StoreError::Sqlx(sqlx::Error::PoolClosed))
            }
        }

        let err = GithubIngestor::new(Arc::new(Broken))
            .process(GithubEvent {
                event: "ping".to_string(),
                delivery_id: "d".to_string(),
                payload: json!({}),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
    }
}
