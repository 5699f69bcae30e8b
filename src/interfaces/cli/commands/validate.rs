//! Validate command - check a range data file before it goes live

use colored::Colorize;

use crate::interfaces::cli::CliError;
use crate::services::geoip::DataValidator;

/// Validate `path` and print the summary, the metrics and every error
pub fn validate_file(path: &str) -> Result<(), CliError> {
    let validator = DataValidator::new();
    let result = validator.validate_file(path);
    let metrics = validator.metrics();

    println!("{} {}", "Validating".yellow(), path.blue());
    println!("  {}:   {}", "Total".cyan(), metrics.total_records);
    println!("  {}:   {}", "Valid".cyan(), metrics.valid_records.to_string().green());
    println!(
        "  {}: {}",
        "Invalid".cyan(),
        if metrics.invalid_records > 0 {
            metrics.invalid_records.to_string().red()
        } else {
            metrics.invalid_records.to_string().green()
        }
    );

    for err in &metrics.validation_errors {
        println!("  {} {}", "✗".red(), err);
    }

    if result.is_valid {
        println!("{} {}", "✓".bold().green(), result.message);
        Ok(())
    } else {
        Err(CliError::CommandError(result.message))
    }
}
