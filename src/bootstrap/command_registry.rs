use async_trait::async_trait;
use clap::{Arg, ArgMatches, Command};

use std::path::PathBuf;

use crate::conf::{AppConfig, ConfigOverrides};
use crate::error::{AppError, AppResult};

/// 命令注册器trait，各模块实现此trait来注册命令
#[async_trait]
pub trait CommandModule: Send + Sync {
    /// 获取模块名称
    fn module_name(&self) -> &'static str;

    /// 注册模块的子命令
    fn register_commands(&self) -> Vec<Command>;

    /// 处理模块命令
    async fn handle_command(
        &self,
        command_name: &str,
        matches: &ArgMatches,
        config: &AppConfig,
    ) -> AppResult<()>;
}

/// 命令注册器
///
/// Built once in `main` and passed along; modules are consulted in registration order.
#[derive(Default)]
pub struct CommandRegistry {
    modules: Vec<Box<dyn CommandModule>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册模块
    pub fn register_module(&mut self, module: Box<dyn CommandModule>) {
        self.modules.push(module);
    }

    /// 构建完整的命令行应用
    pub fn build_app(&self) -> Command {
        let mut app = Command::new("panoptes")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Metrics collection API")
            .subcommand_required(true)
            .arg_required_else_help(true)
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("PATH")
                    .help("配置文件路径 / config file")
                    .global(true),
            )
            .arg(
                Arg::new("log-level")
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("日志级别 (trace|debug|info|warn|error)")
                    .global(true),
            )
            .arg(
                Arg::new("log-format")
                    .long("log-format")
                    .value_name("FORMAT")
                    .help("日志格式 (json|text)")
                    .value_parser(["json", "text"])
                    .global(true),
            )
            .arg(
                Arg::new("port")
                    .short('p')
                    .long("port")
                    .value_name("PORT")
                    .help("设置服务器端口")
                    .value_parser(clap::value_parser!(u16))
                    .global(true),
            );

        // 内置命令
        app = app
            .subcommand(
                Command::new("api").about("启动 HTTP 服务 / start the API server"),
            )
            .subcommand(Command::new("migrate").about("执行数据库迁移 / apply database migrations"))
            .subcommand(Command::new("version").about("显示版本信息"));

        // 添加各模块注册的命令
        for module in &self.modules {
            for command in module.register_commands() {
                app = app.subcommand(command);
            }
        }

        app
    }

    /// 分发到注册了该命令的模块
    pub async fn handle_command(
        &self,
        command_name: &str,
        matches: &ArgMatches,
        config: &AppConfig,
    ) -> AppResult<()> {
        for module in &self.modules {
            if module
                .register_commands()
                .iter()
                .any(|c| c.get_name() == command_name)
            {
                return module.handle_command(command_name, matches, config).await;
            }
        }

        Err(AppError::not_found(format!("command '{}'", command_name)))
    }

    /// 获取所有注册的模块名称
    pub fn registered_modules(&self) -> Vec<&'static str> {
        self.modules.iter().map(|m| m.module_name()).collect()
    }
}

/// Global flags may appear at any level; the one closest to the leaf subcommand wins.
fn global_value<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, id: &str) -> Option<T> {
    let mut current = matches;
    let mut found = current.get_one::<T>(id).cloned();
    while let Some((_, sub)) = current.subcommand() {
        if let Some(v) = sub.get_one::<T>(id) {
            found = Some(v.clone());
        }
        current = sub;
    }
    found
}

/// 从命令行参数提取配置覆盖项
pub fn config_overrides(matches: &ArgMatches) -> ConfigOverrides {
    ConfigOverrides {
        config_path: global_value::<String>(matches, "config").map(PathBuf::from),
        log_level: global_value(matches, "log-level"),
        log_format: global_value(matches, "log-format"),
        port: global_value(matches, "port"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct Echo(Arc<AtomicBool>);

    #[async_trait]
    impl CommandModule for Echo {
        fn module_name(&self) -> &'static str {
            "echo"
        }

        fn register_commands(&self) -> Vec<Command> {
            vec![Command::new("echo").arg(Arg::new("word").required(true))]
        }

        async fn handle_command(
            &self,
            _command_name: &str,
            matches: &ArgMatches,
            _config: &AppConfig,
        ) -> AppResult<()> {
            assert_eq!(matches.get_one::<String>("word").map(String::as_str), Some("hi"));
            self.0.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_build_app_is_consistent() {
        let mut registry = CommandRegistry::new();
        registry.register_module(Box::new(Echo(Arc::new(AtomicBool::new(false)))));
        registry.build_app().debug_assert();
        assert_eq!(registry.registered_modules(), vec!["echo"]);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let registry = CommandRegistry::new();
        let matches = registry
            .build_app()
            .try_get_matches_from(["panoptes", "api", "--port", "9001", "--log-format", "text"])
            .unwrap();

        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "api");
        assert_eq!(sub.get_one::<String>("log-format").map(String::as_str), Some("text"));
        assert_eq!(sub.get_one::<u16>("port"), Some(&9001));
    }

    #[test]
    fn test_config_overrides_from_any_level() {
        let mut registry = CommandRegistry::new();
        registry.register_module(Box::new(Echo(Arc::new(AtomicBool::new(false)))));

        let matches = registry
            .build_app()
            .try_get_matches_from([
                "panoptes",
                "--config",
                "/etc/panoptes.toml",
                "echo",
                "hi",
                "--log-level",
                "debug",
            ])
            .unwrap();
        let overrides = config_overrides(&matches);

        assert_eq!(overrides.config_path, Some(PathBuf::from("/etc/panoptes.toml")));
        assert_eq!(overrides.log_level.as_deref(), Some("debug"));
        assert_eq!(overrides.log_format, None);
        assert_eq!(overrides.port, None);
    }

    #[tokio::test]
    async fn test_dispatch() {
        let called = Arc::new(AtomicBool::new(false));
        let mut registry = CommandRegistry::new();
        registry.register_module(Box::new(Echo(called.clone())));

        let matches = registry
            .build_app()
            .try_get_matches_from(["panoptes", "echo", "hi"])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        registry
            .handle_command(name, sub, &AppConfig::default())
            .await
            .unwrap();
        assert!(called.load(Ordering::SeqCst));

        let err = registry
            .handle_command("nope", sub, &AppConfig::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
