use anyhow::Context;
use clap::Parser;
use tracing::debug;

use geoip_resolver::cli::Cli;
use geoip_resolver::config::{get_config, init_config};
use geoip_resolver::interfaces::cli::run_cli_command;
use geoip_resolver::system::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // 加载配置：config.toml → GEO__* 环境变量
    init_config(&cli.config);
    let config = get_config();

    // 初始化日志，guard 必须存活到程序退出
    let log_guard = init_logging(&config.logging).context("Failed to initialize logging")?;
    debug!(
        "Starting geoip-resolver v{} with {} worker threads",
        env!("CARGO_PKG_VERSION"),
        num_cpus::get()
    );

    if let Err(e) = run_cli_command(cli.command, &config).await {
        eprintln!("{}", e.format_colored());
        drop(log_guard);
        std::process::exit(1);
    }

    Ok(())
}
