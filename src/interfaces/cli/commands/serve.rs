//! Serve command - long-running resolver fed from stdin

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};

use super::ResolvedLocation;
use crate::config::StaticConfig;
use crate::interfaces::cli::CliError;
use crate::services::geoip::ResolutionEngine;
use crate::system::Scheduler;

/// 读取 stdin 中的 IP（每行一个），每行输出一个 JSON 结果，直到 EOF 或 Ctrl+C
pub async fn serve(config: &StaticConfig) -> Result<(), CliError> {
    let (engine, registry) = ResolutionEngine::from_config(&config.geoip);
    let engine = Arc::new(engine);

    if config.scheduler.refresh_on_startup {
        let report = engine.refresh_all().await;
        info!(
            "Startup load finished: {}/{} sources refreshed",
            report.results.len() - report.failed().count(),
            report.results.len()
        );
    } else {
        warn!("refresh_on_startup disabled, sources stay unavailable until the first scheduled refresh");
    }

    let scheduler = Scheduler::start(
        Arc::clone(&engine),
        Arc::clone(&registry.backup),
        &config.scheduler,
    )?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut resolved: u64 = 0;

    info!("Reading IP addresses from stdin");
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let ip = line.trim();
                    if ip.is_empty() {
                        continue;
                    }
                    let location = engine.resolve(ip).await;
                    let mut json = ResolvedLocation { ip, location }.to_json(false)?;
                    json.push('\n');
                    stdout.write_all(json.as_bytes()).await?;
                    stdout.flush().await?;
                    resolved += 1;
                }
                Ok(None) => {
                    info!("Input closed");
                    break;
                }
                Err(e) => {
                    error!("Failed to read from stdin: {}", e);
                    break;
                }
            },
            result = signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Shutdown signal received"),
                    Err(e) => warn!("Failed to listen for Ctrl+C: {}. Shutting down anyway.", e),
                }
                break;
            }
        }
    }

    scheduler.shutdown().await;
    info!(
        "Resolved {} addresses, {} cached entries at shutdown",
        resolved,
        engine.cache_size()
    );
    Ok(())
}
