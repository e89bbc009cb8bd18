use clap::ArgMatches;

use panoptes::bootstrap::{config_overrides, run_migrations, AppBootstrap, CommandRegistry};
use panoptes::conf::AppConfig;
use panoptes::error::AppResult;
use panoptes::logging::init_tracing;

#[actix_web::main]
async fn main() {
    // 初始化所有模块的命令
    let registry = panoptes::init_commands();

    // 构建命令行应用
    let matches: ArgMatches = registry.build_app().get_matches();

    if let Err(e) = run(&registry, &matches).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(registry: &CommandRegistry, matches: &ArgMatches) -> AppResult<()> {
    if let Some(("version", _)) = matches.subcommand() {
        println!("panoptes {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = AppConfig::load(&config_overrides(matches))?;
    init_tracing(&config.logging)?;

    match matches.subcommand() {
        Some(("api", _)) => AppBootstrap::new(config).run().await,
        Some(("migrate", _)) => run_migrations(&config).await,
        Some((command_name, sub_matches)) => {
            // 交给注册的模块处理
            registry.handle_command(command_name, sub_matches, &config).await
        }
        // subcommand_required(true) 保证不会到这里
        None => Ok(()),
    }
}
