//! 访问令牌签发
//! Access token issuance

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::models::AccessToken;
use super::repo::{AccessTokensRepo, UsersRepo};
use crate::comm::{random_string, Clock, Hasher, SystemClock};
use crate::error::{AppError, AppResult};
use crate::repository::StoreError;

pub const TOKEN_ID_PREFIX: &str = "PAT_";
pub const TOKEN_ID_BODY_LEN: usize = 16;
pub const TOKEN_SECRET_LEN: usize = 32;

/// 永不过期
pub const NEVER_EXPIRES: i64 = -1;

/// 签发配置
/// Issuer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokensConfig {
    /// How many freshly generated IDs to try before giving up on collisions.
    pub max_id_attempts: u32,
}

impl Default for AccessTokensConfig {
    fn default() -> Self {
        Self { max_id_attempts: 3 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenDefinition {
    pub expiry_days: i64,
    pub user_id: Uuid,
}

impl TokenDefinition {
    pub fn validate(&self) -> AppResult<()> {
        if self.expiry_days == NEVER_EXPIRES || self.expiry_days > 0 {
            Ok(())
        } else {
            Err(AppError::validation(
                "expiry_days",
                "expiry days must be -1 or greater than 0",
            ))
        }
    }

    /// `None` for tokens that never expire.
    pub fn expire_at(&self, now: DateTime<Utc>) -> AppResult<Option<DateTime<Utc>>> {
        if self.expiry_days == NEVER_EXPIRES {
            return Ok(None);
        }

        Duration::try_days(self.expiry_days)
            .and_then(|delta| now.checked_add_signed(delta))
            .map(Some)
            .ok_or_else(|| AppError::validation("expiry_days", "expiry days out of range"))
    }
}

pub fn generate_token_id() -> String {
    format!("{}{}", TOKEN_ID_PREFIX, random_string(TOKEN_ID_BODY_LEN))
}

pub struct AccessTokensService {
    hasher: Arc<dyn Hasher>,
    users: Arc<dyn UsersRepo>,
    repo: Arc<dyn AccessTokensRepo>,
    clock: Arc<dyn Clock>,
    config: AccessTokensConfig,
}

impl AccessTokensService {
    pub fn new(
        hasher: Arc<dyn Hasher>,
        users: Arc<dyn UsersRepo>,
        repo: Arc<dyn AccessTokensRepo>,
        config: AccessTokensConfig,
    ) -> Self {
        Self {
            hasher,
            users,
            repo,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 为用户签发新令牌
    ///
    /// The returned token is the only place the plaintext secret ever appears.
    #[instrument(skip(self, def), fields(user_id = %def.user_id, expiry_days = def.expiry_days))]
    pub async fn create(&self, def: TokenDefinition) -> AppResult<AccessToken> {
        def.validate()?;

        let user = self
            .users
            .get(def.user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {}", def.user_id)))?;

        let secret = random_string(TOKEN_SECRET_LEN);
        let secret_hash = self.hash_secret(&secret).await?;
        let expire_at = def.expire_at(self.clock.now())?;

        let mut token = AccessToken {
            id: generate_token_id(),
            secret: Some(secret),
            secret_hash,
            expire_at,
            user,
        };

        let attempts = self.config.max_id_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.repo.create(&token.record()).await {
                Ok(()) => break,
                Err(StoreError::Collision { id }) if attempt < attempts => {
                    warn!(token_id = %id, attempt, "token id collision, regenerating");
                    token.id = generate_token_id();
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(token_id = %token.id, never_expires = token.expire_at.is_none(), "access token created");
        Ok(token)
    }

    async fn hash_secret(&self, secret: &str) -> AppResult<String> {
        let hasher = self.hasher.clone();
        let secret = secret.to_string();

        let hash = tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("hashing task failed: {}", e)))??;

        Ok(hash)
    }
}
