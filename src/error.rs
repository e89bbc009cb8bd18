use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::comm::encryption::HashError;
use crate::repository::error::StoreError;

/// 对外统一的拒绝信息，认证失败与授权失败不可区分
/// Single outward denial message; authentication and authorization failures look identical
pub const NOT_AUTHORIZED_MESSAGE: &str = "Not authorized to perform this action.";

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error.";
pub const INTERNAL_ERROR_CODE: i32 = 1000;

/// 错误响应体
/// Error response body shared by every failed request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorBody,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub code: i32,
    pub message: String,
    /// Only present on 500s when debug errors are enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorBody {
                code,
                message: message.into(),
                details: None,
            },
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.error.details = Some(details.into());
        self
    }
}

/// 统一的应用错误类型
/// Unified application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("validation error: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("resource not found: {resource}")]
    NotFound { resource: String },

    #[error("authentication failed: {reason}")]
    Authentication { reason: String },

    #[error("authorization failed: {reason}")]
    Authorization { reason: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("hashing error: {0}")]
    Hashing(#[from] HashError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// 错误分类
/// Error taxonomy as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Authentication,
    Authorization,
    Infrastructure,
}

impl AppError {
    /// 创建验证错误
    pub fn validation<T: Into<String>, U: Into<String>>(field: T, message: U) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// 创建资源未找到错误
    pub fn not_found<T: Into<String>>(resource: T) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// 创建认证错误
    pub fn authentication<T: Into<String>>(reason: T) -> Self {
        Self::Authentication {
            reason: reason.into(),
        }
    }

    /// 创建授权错误
    pub fn authorization<T: Into<String>>(reason: T) -> Self {
        Self::Authorization {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation { .. } => ErrorKind::Validation,
            AppError::NotFound { .. } => ErrorKind::NotFound,
            AppError::Authentication { .. } => ErrorKind::Authentication,
            AppError::Authorization { .. } => ErrorKind::Authorization,
            AppError::Config(_)
            | AppError::Store(_)
            | AppError::Hashing(_)
            | AppError::Internal(_) => ErrorKind::Infrastructure,
        }
    }

    pub fn is_denial(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Authentication | ErrorKind::Authorization
        )
    }

    /// 获取错误代码
    /// Denials share one code so the response cannot tell them apart.
    pub fn error_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Infrastructure => INTERNAL_ERROR_CODE,
            ErrorKind::Authentication | ErrorKind::Authorization => 1002,
            ErrorKind::Validation => 1004,
            ErrorKind::NotFound => 1009,
        }
    }

    /// 对外可见的错误信息
    /// Message safe to send to the caller
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Authentication | ErrorKind::Authorization => {
                NOT_AUTHORIZED_MESSAGE.to_string()
            }
            ErrorKind::Infrastructure => INTERNAL_ERROR_MESSAGE.to_string(),
            ErrorKind::Validation | ErrorKind::NotFound => self.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Authentication | ErrorKind::Authorization => StatusCode::UNAUTHORIZED,
            ErrorKind::Infrastructure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // 记录错误日志，详细信息只进入日志
        match self.kind() {
            ErrorKind::Infrastructure => {
                tracing::error!(error = %self, "request failed");
            }
            ErrorKind::Authentication | ErrorKind::Authorization => {
                tracing::info!(reason = %self, "request denied");
            }
            _ => {
                tracing::debug!(error = %self, "client error");
            }
        }

        HttpResponse::build(self.status_code())
            .json(ErrorEnvelope::new(self.error_code(), self.public_message()))
    }
}

/// 应用结果类型
pub type AppResult<T> = Result<T, AppError>;
