//! 单向哈希：bcrypt 实现，同时满足 Hasher 与 Verifier 两种能力
//! One-way hashing: a bcrypt component serving both the `Hasher` and `Verifier` roles

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::random::random_string;

pub const MIN_WORK_FACTOR: u32 = 4;
pub const MAX_WORK_FACTOR: u32 = 31;

const DECOY_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("work factor {0} outside bcrypt range {MIN_WORK_FACTOR}..={MAX_WORK_FACTOR}")]
    InvalidWorkFactor(u32),
    #[error("bcrypt error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
}

/// 生成密文摘要（密码、访问令牌密钥）
pub trait Hasher: Send + Sync {
    fn hash(&self, secret: &str) -> Result<String, HashError>;
}

/// 校验明文与摘要是否匹配
pub trait Verifier: Send + Sync {
    /// Malformed digests never match.
    fn verify(&self, hash: &str, candidate: &str) -> bool;

    /// 诱饵摘要：与真实摘要同等代价，但不匹配任何调用方提交的密钥
    /// A well-formed digest at the verifier's own cost that no presented secret matches.
    /// Verifying against it costs the same as verifying against a stored hash.
    fn decoy_hash(&self) -> &str;
}

/// 哈希配置
/// Hasher configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HasherConfig {
    pub work_factor: u32,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self { work_factor: 12 }
    }
}

#[derive(Debug, Clone)]
pub struct Bcrypter {
    cost: u32,
    decoy: String,
}

impl Bcrypter {
    pub fn new(config: HasherConfig) -> Result<Self, HashError> {
        if !(MIN_WORK_FACTOR..=MAX_WORK_FACTOR).contains(&config.work_factor) {
            return Err(HashError::InvalidWorkFactor(config.work_factor));
        }

        let decoy = bcrypt::hash(random_string(DECOY_SECRET_LEN), config.work_factor)?;
        Ok(Self {
            cost: config.work_factor,
            decoy,
        })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Hasher for Bcrypter {
    fn hash(&self, secret: &str) -> Result<String, HashError> {
        Ok(bcrypt::hash(secret, self.cost)?)
    }
}

impl Verifier for Bcrypter {
    fn verify(&self, hash: &str, candidate: &str) -> bool {
        bcrypt::verify(candidate, hash).unwrap_or(false)
    }

    fn decoy_hash(&self) -> &str {
        &self.decoy
    }
}
