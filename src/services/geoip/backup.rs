//! 参考数据快照
//!
//! 每次刷新前把当前数据文件复制到备份目录，文件名为 `<basename>_<YYYYMMDD_HHMMSS>.csv`，
//! 并定期删除超出保留期的快照。

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, Local, NaiveDateTime};
use tracing::{debug, error, info, warn};

use crate::errors::{GeoError, Result};

/// 快照文件名中的时间戳格式
pub const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const SNAPSHOT_EXTENSION: &str = "csv";
const MAX_RETENTION_DAYS: u64 = 100_000;

/// 备份目录中的一份快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub path: PathBuf,
    /// 无法从文件名解析时间的快照为 None
    pub taken_at: Option<NaiveDateTime>,
}

/// 快照管理器
#[derive(Debug, Clone)]
pub struct BackupManager {
    source_file: PathBuf,
    backup_dir: PathBuf,
    retention: Duration,
}

impl BackupManager {
    pub fn new(
        source_file: impl Into<PathBuf>,
        backup_dir: impl Into<PathBuf>,
        retention_days: u64,
    ) -> Self {
        Self {
            source_file: source_file.into(),
            backup_dir: backup_dir.into(),
            retention: Duration::days(retention_days.min(MAX_RETENTION_DAYS) as i64),
        }
    }

    pub fn source_file(&self) -> &Path {
        &self.source_file
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    fn basename(&self) -> &str {
        self.source_file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("geoip")
    }

    /// 为当前数据文件创建快照，返回快照路径
    ///
    /// 失败会记录日志并返回错误，调用方可以选择忽略
    pub fn backup(&self) -> Result<PathBuf> {
        self.backup_at(Local::now().naive_local())
    }

    fn backup_at(&self, now: NaiveDateTime) -> Result<PathBuf> {
        fs::create_dir_all(&self.backup_dir).map_err(|e| {
            error!(
                "Failed to create backup directory {}: {}",
                self.backup_dir.display(),
                e
            );
            GeoError::backup(format!(
                "Failed to create backup directory {}: {}",
                self.backup_dir.display(),
                e
            ))
        })?;

        let file_name = format!(
            "{}_{}.{}",
            self.basename(),
            now.format(SNAPSHOT_TIMESTAMP_FORMAT),
            SNAPSHOT_EXTENSION
        );
        let target = self.backup_dir.join(file_name);

        match fs::copy(&self.source_file, &target) {
            Ok(bytes) => {
                info!("Backup created: {} ({} bytes)", target.display(), bytes);
                Ok(target)
            }
            Err(e) => {
                error!(
                    "Failed to back up {} to {}: {}",
                    self.source_file.display(),
                    target.display(),
                    e
                );
                Err(GeoError::backup(format!(
                    "Failed to back up {}: {}",
                    self.source_file.display(),
                    e
                )))
            }
        }
    }

    /// 删除早于保留期的快照，返回删除数量
    pub fn prune(&self, retention: Duration) -> Result<usize> {
        self.prune_before(Local::now().naive_local() - retention)
    }

    /// 按配置的保留期清理
    pub fn prune_expired(&self) -> Result<usize> {
        self.prune(self.retention)
    }

    /// 删除时间戳早于 `cutoff` 的快照
    ///
    /// 文件名解析不出时间的快照一律保留
    pub fn prune_before(&self, cutoff: NaiveDateTime) -> Result<usize> {
        let mut deleted = 0;

        for snapshot in self.list_snapshots()? {
            let Some(taken_at) = snapshot.taken_at else {
                debug!(
                    "Keeping undatable snapshot {}",
                    snapshot.path.display()
                );
                continue;
            };
            if taken_at >= cutoff {
                continue;
            }

            match fs::remove_file(&snapshot.path) {
                Ok(()) => {
                    deleted += 1;
                    info!("Deleted old backup: {}", snapshot.path.display());
                }
                Err(e) => {
                    error!(
                        "Failed to delete old backup {}: {}",
                        snapshot.path.display(),
                        e
                    );
                }
            }
        }

        Ok(deleted)
    }

    /// 列出备份目录中的快照，最新的在前
    ///
    /// 备份目录不存在时返回空列表
    pub fn list_snapshots(&self) -> Result<Vec<Snapshot>> {
        let entries = match fs::read_dir(&self.backup_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(GeoError::backup(format!(
                    "Failed to list backup directory {}: {}",
                    self.backup_dir.display(),
                    e
                )));
            }
        };

        let basename = self.basename();
        let mut snapshots: Vec<Snapshot> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path.extension().and_then(|e| e.to_str()) == Some(SNAPSHOT_EXTENSION)
            })
            .map(|path| {
                let taken_at = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(|n| parse_snapshot_timestamp(n, basename));
                Snapshot { path, taken_at }
            })
            .collect();

        snapshots.sort_by(|a, b| b.taken_at.cmp(&a.taken_at).then_with(|| a.path.cmp(&b.path)));
        Ok(snapshots)
    }

    /// 用指定快照覆盖当前数据文件（运维手动恢复）
    ///
    /// 先写临时文件再重命名，避免读者看到写了一半的文件
    pub fn restore_from<P: AsRef<Path>>(&self, snapshot: P) -> Result<()> {
        let snapshot = snapshot.as_ref();
        if !snapshot.is_file() {
            return Err(GeoError::backup(format!(
                "Snapshot {} does not exist",
                snapshot.display()
            )));
        }

        let staging = self.source_file.with_extension("csv.restore");
        if let Some(parent) = self.source_file.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        fs::copy(snapshot, &staging).map_err(|e| {
            GeoError::backup(format!(
                "Failed to stage snapshot {}: {}",
                snapshot.display(),
                e
            ))
        })?;

        if let Err(e) = fs::rename(&staging, &self.source_file) {
            let _ = fs::remove_file(&staging);
            warn!(
                "Failed to restore {} from {}: {}",
                self.source_file.display(),
                snapshot.display(),
                e
            );
            return Err(GeoError::backup(format!(
                "Failed to restore from {}: {}",
                snapshot.display(),
                e
            )));
        }

        info!("Restored from backup: {}", snapshot.display());
        Ok(())
    }
}

/// 从 `<basename>_<YYYYMMDD_HHMMSS>.csv` 中解析时间戳
pub fn parse_snapshot_timestamp(file_name: &str, basename: &str) -> Option<NaiveDateTime> {
    let stamp = file_name
        .strip_prefix(basename)?
        .strip_prefix('_')?
        .strip_suffix(".csv")?;
    NaiveDateTime::parse_from_str(stamp, SNAPSHOT_TIMESTAMP_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn setup() -> (TempDir, BackupManager) {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("ip-ranges.csv");
        fs::write(&source, "header\n").unwrap();
        let manager = BackupManager::new(source, dir.path().join("backup"), 7);
        (dir, manager)
    }

    #[test]
    fn test_parse_snapshot_timestamp() {
        assert_eq!(
            parse_snapshot_timestamp("ip-ranges_20240102_030405.csv", "ip-ranges"),
            NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(3, 4, 5)
        );
        assert_eq!(
            parse_snapshot_timestamp("ip-ranges_latest.csv", "ip-ranges"),
            None
        );
        assert_eq!(
            parse_snapshot_timestamp("other_20240102_030405.csv", "ip-ranges"),
            None
        );
        assert_eq!(
            parse_snapshot_timestamp("ip-ranges_20240102_030405.txt", "ip-ranges"),
            None
        );
    }

    #[test]
    fn test_backup_creates_directory_and_copy() {
        let (_dir, manager) = setup();
        assert!(!manager.backup_dir().exists());

        let snapshot = manager.backup_at(at(2024, 5, 1, 12)).unwrap();
        assert!(manager.backup_dir().is_dir());
        assert_eq!(
            snapshot.file_name().unwrap().to_str().unwrap(),
            "ip-ranges_20240501_120000.csv"
        );
        assert_eq!(fs::read_to_string(snapshot).unwrap(), "header\n");
    }

    #[test]
    fn test_backup_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let manager = BackupManager::new(dir.path().join("missing.csv"), dir.path().join("b"), 7);
        assert!(matches!(manager.backup(), Err(GeoError::Backup(_))));
    }

    #[test]
    fn test_prune_keeps_recent_and_undatable() {
        let (_dir, manager) = setup();
        manager.backup_at(at(2024, 1, 1, 0)).unwrap();
        manager.backup_at(at(2024, 1, 9, 0)).unwrap();
        fs::write(manager.backup_dir().join("ip-ranges_manual.csv"), "x").unwrap();

        let deleted = manager.prune_before(at(2024, 1, 2, 0)).unwrap();
        assert_eq!(deleted, 1);

        let remaining = manager.list_snapshots().unwrap();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].taken_at, Some(at(2024, 1, 9, 0)));
        assert_eq!(remaining[1].taken_at, None);
    }

    #[test]
    fn test_prune_with_retention_window() {
        let (_dir, manager) = setup();
        let now = Local::now().naive_local();
        manager.backup_at(now - Duration::days(10)).unwrap();
        manager.backup_at(now - Duration::days(1)).unwrap();

        assert_eq!(manager.prune_expired().unwrap(), 1);
        assert_eq!(manager.list_snapshots().unwrap().len(), 1);
    }

    #[test]
    fn test_list_snapshots_without_directory() {
        let (_dir, manager) = setup();
        assert!(manager.list_snapshots().unwrap().is_empty());
        assert_eq!(manager.prune_expired().unwrap(), 0);
    }

    #[test]
    fn test_restore_from_snapshot() {
        let (_dir, manager) = setup();
        let snapshot = manager.backup_at(at(2024, 1, 1, 0)).unwrap();

        fs::write(manager.source_file(), "corrupted").unwrap();
        manager.restore_from(&snapshot).unwrap();
        assert_eq!(
            fs::read_to_string(manager.source_file()).unwrap(),
            "header\n"
        );
    }

    #[test]
    fn test_restore_from_missing_snapshot() {
        let (dir, manager) = setup();
        let result = manager.restore_from(dir.path().join("nope.csv"));
        assert!(result.is_err());
        assert_eq!(
            fs::read_to_string(manager.source_file()).unwrap(),
            "header\n"
        );
    }
}
