//! 日志初始化
//! Tracing subscriber and HTTP access log setup

use actix_web::middleware::Logger;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

use crate::conf::{AccessLogConfig, LogFormat, LoggingConfig};
use crate::error::{AppError, AppResult};

pub const APP_NAME: &str = "panoptes";

const JSON_ACCESS_LOG: &str = r#"{"remote_ip":"%a","request":"%r","status":%s,"size":%b,"referer":"%{Referer}i","user_agent":"%{User-Agent}i","duration_ms":%D,"request_id":"%{X-Request-ID}o"}"#;

/// `RUST_LOG` wins over the configured level when set.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// 初始化全局 tracing 订阅者
///
/// Logs go to stderr so command output on stdout stays clean.
pub fn init_tracing(config: &LoggingConfig) -> AppResult<()> {
    // actix 使用 log 宏，桥接到 tracing
    LogTracer::init().ok();

    let filter = env_filter(&config.level);
    let result = match config.format {
        LogFormat::Json => {
            let subscriber = Registry::default()
                .with(filter)
                .with(JsonStorageLayer)
                .with(BunyanFormattingLayer::new(APP_NAME.into(), std::io::stderr));
            tracing::subscriber::set_global_default(subscriber)
        }
        LogFormat::Text => {
            let subscriber = Registry::default()
                .with(filter)
                .with(fmt::layer().compact().with_target(true).with_writer(std::io::stderr));
            tracing::subscriber::set_global_default(subscriber)
        }
    };

    result.map_err(|e| AppError::Internal(anyhow::anyhow!("failed to set tracing subscriber: {}", e)))
}

/// HTTP 访问日志
pub fn access_logger(config: &AccessLogConfig) -> Logger {
    match config.format {
        LogFormat::Json => Logger::new(JSON_ACCESS_LOG),
        LogFormat::Text => Logger::default(),
    }
}
