//! Status command - load every source once and report its state

use colored::{ColoredString, Colorize};

use super::load_engine;
use crate::config::StaticConfig;
use crate::interfaces::cli::CliError;
use crate::services::geoip::{RefreshOutcome, SourceState, SourceStatus};

/// Display source status after a refresh
pub async fn source_status(config: &StaticConfig) -> Result<(), CliError> {
    let (engine, _registry, report) = load_engine(&config.geoip).await;

    println!("{}", "Refresh".bold().green());
    for result in &report.results {
        println!(
            "  {} {}",
            format!("{:<14}", result.source).cyan(),
            describe_outcome(&result.outcome)
        );
    }
    println!(
        "  {} {}ms",
        "Took".dimmed(),
        report.duration_ms().to_string().dimmed()
    );

    println!();
    println!("{}", "Sources".bold().green());
    for status in engine.status() {
        print_status(&status);
    }

    println!();
    println!(
        "  {}: {}",
        "Cache capacity".cyan(),
        engine.max_cache_size()
    );

    Ok(())
}

fn describe_outcome(outcome: &Result<RefreshOutcome, String>) -> ColoredString {
    match outcome {
        Ok(RefreshOutcome::Reloaded { records }) => {
            format!("reloaded ({} records)", records).green()
        }
        Ok(RefreshOutcome::Reopened) => "reopened".green(),
        Ok(RefreshOutcome::Unchanged) => "unchanged".normal(),
        Ok(RefreshOutcome::Skipped) => "skipped".yellow(),
        Err(e) => format!("failed: {}", e).red(),
    }
}

fn print_status(status: &SourceStatus) {
    let state = match status.state {
        SourceState::Ready => status.state.as_ref().green(),
        SourceState::Failed => status.state.as_ref().red(),
        SourceState::Loading => status.state.as_ref().yellow(),
        SourceState::Uninitialized => status.state.as_ref().dimmed(),
    };

    println!("  {}", status.name.bold());
    println!("    {}:      {}", "State".cyan(), state);
    println!(
        "    {}:  {}",
        "Available".cyan(),
        if status.available {
            "yes".green()
        } else {
            "no".red()
        }
    );
    println!("    {}: {:.2}", "Confidence".cyan(), status.confidence);
    if let Some(records) = status.records {
        println!("    {}:    {}", "Records".cyan(), records);
    }
    if let Some(last) = status.last_refresh {
        println!(
            "    {}: {}",
            "Last refresh".cyan(),
            last.to_rfc3339().dimmed()
        );
    }
}
