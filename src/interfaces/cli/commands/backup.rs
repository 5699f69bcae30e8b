//! Backup commands - create, list, prune and restore range data snapshots

use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::config::GeoIpConfig;
use crate::interfaces::cli::CliError;
use crate::services::geoip::BackupManager;

fn manager(config: &GeoIpConfig, retention_days: u64) -> BackupManager {
    BackupManager::new(&config.csv_path, &config.backup_dir, retention_days)
}

pub fn create(config: &GeoIpConfig) -> Result<(), CliError> {
    let path = manager(config, config.backup_retention_days).backup()?;
    println!(
        "{} {}",
        "Snapshot created:".green(),
        path.display().to_string().blue()
    );
    Ok(())
}

pub fn list(config: &GeoIpConfig) -> Result<(), CliError> {
    let manager = manager(config, config.backup_retention_days);
    let snapshots = manager.list_snapshots()?;

    if snapshots.is_empty() {
        println!(
            "{} No snapshots in {}",
            "ℹ".bold().blue(),
            manager.backup_dir().display()
        );
        return Ok(());
    }

    println!(
        "{} ({})",
        "Snapshots".bold().green(),
        manager.backup_dir().display()
    );
    for snapshot in snapshots {
        let name = snapshot
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let taken_at = match snapshot.taken_at {
            Some(t) => t.format("%Y-%m-%d %H:%M:%S").to_string().normal(),
            None => "undated".yellow(),
        };
        println!("  {}  {}", taken_at, name.cyan());
    }
    Ok(())
}

pub fn prune(config: &GeoIpConfig, retention_days: Option<u64>) -> Result<(), CliError> {
    let days = retention_days.unwrap_or(config.backup_retention_days);
    let removed = manager(config, days).prune_expired()?;
    println!(
        "{} {} snapshot(s) older than {} day(s)",
        "Pruned".green(),
        removed,
        days
    );
    Ok(())
}

pub fn restore(config: &GeoIpConfig, snapshot: &str) -> Result<(), CliError> {
    let manager = manager(config, config.backup_retention_days);
    let path = resolve_snapshot_path(&manager, snapshot);
    manager.restore_from(&path)?;
    println!(
        "{} {} {} {}",
        "Restored".green(),
        manager.source_file().display().to_string().blue(),
        "from".green(),
        path.display().to_string().blue()
    );
    println!(
        "  {}",
        "Run `status` or wait for the next scheduled refresh to load it".yellow()
    );
    Ok(())
}

/// 直接给出的路径存在就用它，否则当作备份目录中的文件名
fn resolve_snapshot_path(manager: &BackupManager, snapshot: &str) -> PathBuf {
    let direct = Path::new(snapshot);
    if direct.is_file() {
        direct.to_path_buf()
    } else {
        manager.backup_dir().join(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> GeoIpConfig {
        GeoIpConfig {
            csv_path: dir.path().join("ip-ranges.csv").display().to_string(),
            backup_dir: dir.path().join("backup").display().to_string(),
            ..GeoIpConfig::default()
        }
    }

    #[test]
    fn test_create_and_restore_by_name() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        fs::write(&config.csv_path, "original").unwrap();

        create(&config).unwrap();
        let snapshots = manager(&config, 7).list_snapshots().unwrap();
        assert_eq!(snapshots.len(), 1);

        fs::write(&config.csv_path, "changed").unwrap();
        let name = snapshots[0].path.file_name().unwrap().to_str().unwrap().to_string();
        restore(&config, &name).unwrap();

        assert_eq!(fs::read_to_string(&config.csv_path).unwrap(), "original");
    }

    #[test]
    fn test_restore_missing_snapshot_fails() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        assert!(matches!(
            restore(&config, "nope.csv"),
            Err(CliError::DataError(_))
        ));
    }

    #[test]
    fn test_prune_with_override() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let backup_dir = dir.path().join("backup");
        fs::create_dir_all(&backup_dir).unwrap();
        fs::write(backup_dir.join("ip-ranges_20000101_000000.csv"), "old").unwrap();
        fs::write(backup_dir.join("ip-ranges_notadate.csv"), "keep").unwrap();

        prune(&config, Some(1)).unwrap();

        assert!(!backup_dir.join("ip-ranges_20000101_000000.csv").exists());
        assert!(backup_dir.join("ip-ranges_notadate.csv").exists());
    }
}
