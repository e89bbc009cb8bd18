pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod comm;
pub mod conf;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod repository;

// Modules
pub mod modules;

pub use bootstrap::{app_bootstrap, command_registry};

use command_registry::CommandRegistry;

/// 初始化所有模块的命令
pub fn init_commands() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry.register_module(Box::new(modules::users::UsersCommands));
    registry
}
