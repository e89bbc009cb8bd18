use std::sync::Arc;

use actix_web::{
    middleware::{Condition, NormalizePath},
    web, App, HttpServer,
};
use tracing::{info, instrument, warn};

use crate::api::openapi;
use crate::auth::AuthorizationGate;
use crate::comm::Bcrypter;
use crate::conf::{AppConfig, DbConfig, DbDriver};
use crate::error::{AppError, AppResult};
use crate::logging::access_logger;
use crate::middleware::{debug_errors, RequestIdMiddleware};
use crate::modules::ingestion::{GithubIngestor, GithubWebhooksRepo};
use crate::modules::users::repo::{AccessTokensRepo, RolesRepo, UsersRepo};
use crate::modules::users::{AccessTokensService, UsersService};
use crate::modules::{ingestion, probes, users};
use crate::repository::postgres::{
    Connector, PgAccessTokensRepository, PgGithubWebhooksRepository, PgRolesRepository,
    PgUsersRepository,
};
use crate::repository::MemoryStore;

pub const API_PREFIX: &str = "/api/v1";

/// 存储集合
/// One handle per storage contract, all backed by the same driver
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UsersRepo>,
    pub roles: Arc<dyn RolesRepo>,
    pub tokens: Arc<dyn AccessTokensRepo>,
    pub webhooks: Arc<dyn GithubWebhooksRepo>,
}

impl Stores {
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            roles: store.clone(),
            tokens: store.clone(),
            webhooks: store,
        }
    }

    pub fn postgres(connector: &Connector) -> Self {
        let pool = connector.pool().clone();
        Self {
            users: Arc::new(PgUsersRepository::new(pool.clone())),
            roles: Arc::new(PgRolesRepository::new(pool.clone())),
            tokens: Arc::new(PgAccessTokensRepository::new(pool.clone())),
            webhooks: Arc::new(PgGithubWebhooksRepository::new(pool)),
        }
    }

    pub async fn from_config(config: &DbConfig) -> AppResult<Self> {
        match config.driver {
            DbDriver::Postgres => Ok(Self::postgres(&Connector::connect(&config.postgres).await?)),
            DbDriver::Memory => {
                warn!("using in-memory store; nothing survives a restart");
                Ok(Self::memory(Arc::new(MemoryStore::new())))
            }
        }
    }
}

/// 组合根
///
/// Every service is built here once from the configuration and shared by `Arc`. The
/// same `Bcrypter` hashes (issuer, user registration) and verifies (gate).
#[derive(Clone)]
pub struct Services {
    pub stores: Stores,
    pub hasher: Arc<Bcrypter>,
    pub users: Arc<UsersService>,
    pub access_tokens: Arc<AccessTokensService>,
    pub gate: Arc<AuthorizationGate>,
    pub github: Arc<GithubIngestor>,
}

impl Services {
    pub async fn build(config: &AppConfig) -> AppResult<Self> {
        let stores = Stores::from_config(&config.db).await?;
        Self::with_stores(config, stores)
    }

    pub fn with_stores(config: &AppConfig, stores: Stores) -> AppResult<Self> {
        let hasher = Arc::new(Bcrypter::new(config.auth.hasher)?);

        let users = UsersService::new(stores.users.clone(), stores.roles.clone(), hasher.clone());
        let access_tokens = AccessTokensService::new(
            hasher.clone(),
            stores.users.clone(),
            stores.tokens.clone(),
            config.auth.tokens,
        );
        let gate = AuthorizationGate::new(stores.tokens.clone(), hasher.clone());
        let github = GithubIngestor::new(stores.webhooks.clone());

        Ok(Self {
            stores,
            hasher,
            users: Arc::new(users),
            access_tokens: Arc::new(access_tokens),
            gate: Arc::new(gate),
            github: Arc::new(github),
        })
    }
}

/// 请求体解析失败时仍返回统一错误结构
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| AppError::validation("body", err.to_string()).into())
}

/// 注册 API 路由与共享状态
pub fn configure_api(cfg: &mut web::ServiceConfig, services: &Services) {
    cfg.app_data(json_config())
        .app_data(web::Data::from(services.gate.clone()))
        .app_data(web::Data::from(services.users.clone()))
        .app_data(web::Data::from(services.github.clone()))
        .service(
            web::scope(API_PREFIX)
                .configure(probes::configure)
                .configure(openapi::configure)
                .configure(users::routes::configure)
                .configure(ingestion::routes::configure),
        );
}

/// 执行数据库迁移
pub async fn run_migrations(config: &AppConfig) -> AppResult<()> {
    if config.db.driver != DbDriver::Postgres {
        return Err(AppError::validation(
            "db.driver",
            "migrations need the postgres driver",
        ));
    }

    let connector = Connector::connect(&config.db.postgres).await?;
    connector.migrate().await?;
    Ok(())
}

/// 应用启动器
pub struct AppBootstrap {
    config: AppConfig,
}

impl AppBootstrap {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// 运行应用服务器
    #[instrument(skip(self))]
    pub async fn run(self) -> AppResult<()> {
        let services = Services::build(&self.config).await?;
        let server = &self.config.api.server;

        info!(
            host = %server.host,
            port = server.port,
            workers = ?server.workers,
            driver = ?self.config.db.driver,
            "启动应用服务器"
        );

        let access_log = server.access_log.clone();
        let debug_errors_enabled = server.debug_errors_enabled;
        let app_services = services.clone();

        let mut http = HttpServer::new(move || {
            App::new()
                .wrap(Condition::new(debug_errors_enabled, debug_errors()))
                .wrap(NormalizePath::trim())
                .wrap(RequestIdMiddleware)
                .wrap(Condition::new(access_log.enabled, access_logger(&access_log)))
                .configure(|cfg| configure_api(cfg, &app_services))
        });
        if let Some(workers) = server.workers {
            http = http.workers(workers);
        }

        http.bind(self.config.bind_address())
            .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?
            .run()
            .await
            .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?;

        info!("服务器已停止");
        Ok(())
    }
}
