/// 启动与命令分发
pub mod app_bootstrap;
pub mod command_registry;

pub use app_bootstrap::{configure_api, run_migrations, AppBootstrap, Services, Stores, API_PREFIX};
pub use command_registry::{config_overrides, CommandModule, CommandRegistry};
