//! 应用配置
//! Application configuration
//!
//! Sources, lowest priority first: built-in defaults, a config file (`--config`, or
//! `config.{toml,yaml,json}` in the working directory), `PANOPTES_*` environment
//! variables with `__` between nesting levels, then command line overrides.

use std::path::PathBuf;
use std::str::FromStr;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::comm::encryption::{HasherConfig, MAX_WORK_FACTOR, MIN_WORK_FACTOR};
use crate::error::{AppError, AppResult};
use crate::modules::users::access_tokens::AccessTokensConfig;

pub const ENV_PREFIX: &str = "PANOPTES";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}

impl FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" => Ok(LogFormat::Text),
            other => Err(AppError::validation(
                "logging.format",
                format!("unknown log format '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLogConfig {
    pub enabled: bool,
    pub format: LogFormat,
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: LogFormat::Json,
        }
    }
}

/// HTTP 服务配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// actix picks one worker per core when unset.
    pub workers: Option<usize>,
    pub debug_errors_enabled: bool,
    pub access_log: AccessLogConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            workers: None,
            debug_errors_enabled: false,
            access_log: AccessLogConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbDriver {
    Postgres,
    Memory,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub port: u16,
    pub database: String,
    pub schema: String,
    pub connection_retries: u32,
    pub max_connections: u32,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            user: "panoptes".to_string(),
            password: String::new(),
            port: 5432,
            database: "panoptes".to_string(),
            schema: "public".to_string(),
            connection_retries: 3,
            max_connections: 10,
        }
    }
}

impl std::fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("connection_retries", &self.connection_retries)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    pub driver: DbDriver,
    pub postgres: PostgresConfig,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            driver: DbDriver::Postgres,
            postgres: PostgresConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub hasher: HasherConfig,
    pub tokens: AccessTokensConfig,
}

/// 应用配置根
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub api: ApiConfig,
    pub db: DbConfig,
    pub auth: AuthConfig,
}

/// 命令行覆盖项
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    pub port: Option<u16>,
}

impl AppConfig {
    /// 加载并校验配置
    pub fn load(overrides: &ConfigOverrides) -> AppResult<Self> {
        Self::load_with_env(overrides, None)
    }

    /// `env` replaces the process environment when given.
    fn load_with_env(
        overrides: &ConfigOverrides,
        env: Option<config::Map<String, String>>,
    ) -> AppResult<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        builder = match &overrides.config_path {
            Some(path) => builder.add_source(File::from(path.as_path()).required(true)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        if let Some(level) = &overrides.log_level {
            builder = builder.set_override("logging.level", level.as_str())?;
        }
        if let Some(format) = &overrides.log_format {
            builder = builder.set_override("logging.format", format.to_ascii_lowercase())?;
        }
        if let Some(port) = overrides.port {
            builder = builder.set_override("api.server.port", i64::from(port))?;
        }

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if tracing::Level::from_str(&self.logging.level).is_err() {
            return Err(AppError::validation(
                "logging.level",
                format!("unknown log level '{}'", self.logging.level),
            ));
        }

        let work_factor = self.auth.hasher.work_factor;
        if !(MIN_WORK_FACTOR..=MAX_WORK_FACTOR).contains(&work_factor) {
            return Err(AppError::validation(
                "auth.hasher.work_factor",
                format!(
                    "must be between {} and {}, got {}",
                    MIN_WORK_FACTOR, MAX_WORK_FACTOR, work_factor
                ),
            ));
        }

        if self.auth.tokens.max_id_attempts == 0 {
            return Err(AppError::validation(
                "auth.tokens.max_id_attempts",
                "must be greater than 0",
            ));
        }

        if self.db.driver == DbDriver::Postgres && self.db.postgres.host.trim().is_empty() {
            return Err(AppError::validation("db.postgres.host", "is required"));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.api.server.host.clone(), self.api.server.port)
    }
}
