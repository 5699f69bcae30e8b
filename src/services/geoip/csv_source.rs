//! 基于 CSV IP 段表的数据源
//!
//! 刷新流程：校验 → 快照 → 加载并排序 → 原子替换段表。
//! 任何一步失败都保留上一份可用的段表。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::backup::BackupManager;
use super::location::Location;
use super::range_table::RangeTable;
use super::source::{LocationSource, RefreshOutcome, SourceState, SourceStatus, UpdateGuard};
use super::validator::DataValidator;
use crate::config::GeoIpConfig;
use crate::errors::{GeoError, Result};

/// 校验失败时日志中最多展示的错误条数
const LOGGED_VALIDATION_ERRORS: usize = 10;

/// CSV 段表数据源
///
/// 状态放在 `Arc` 里，刷新时整体移入阻塞线程池执行
pub struct CsvRangeSource {
    inner: Arc<CsvSourceInner>,
}

struct CsvSourceInner {
    csv_path: PathBuf,
    confidence: f64,
    validator: DataValidator,
    backup: Arc<BackupManager>,
    table: ArcSwapOption<RangeTable>,
    state: Mutex<SourceState>,
    last_refresh: Mutex<Option<DateTime<Utc>>>,
    updating: AtomicBool,
}

impl CsvRangeSource {
    pub const NAME: &'static str = "CSV_DATABASE";

    pub fn new(csv_path: impl Into<PathBuf>, confidence: f64, backup: Arc<BackupManager>) -> Self {
        Self {
            inner: Arc::new(CsvSourceInner {
                csv_path: csv_path.into(),
                confidence,
                validator: DataValidator::new(),
                backup,
                table: ArcSwapOption::empty(),
                state: Mutex::new(SourceState::Uninitialized),
                last_refresh: Mutex::new(None),
                updating: AtomicBool::new(false),
            }),
        }
    }

    /// 根据 GeoIpConfig 初始化，快照目录与保留期同样来自配置
    pub fn from_config(config: &GeoIpConfig) -> Self {
        let backup = BackupManager::new(
            &config.csv_path,
            &config.backup_dir,
            config.backup_retention_days,
        );
        Self::new(&config.csv_path, config.csv_confidence, Arc::new(backup))
    }

    pub fn csv_path(&self) -> &Path {
        &self.inner.csv_path
    }

    pub fn backup_manager(&self) -> Arc<BackupManager> {
        Arc::clone(&self.inner.backup)
    }

    pub fn validator(&self) -> &DataValidator {
        &self.inner.validator
    }

    pub fn state(&self) -> SourceState {
        *self.inner.state.lock()
    }

    /// 当前生效的段表记录数
    pub fn records(&self) -> Option<usize> {
        self.inner.records()
    }

    /// 同步执行一次完整的刷新
    ///
    /// 已有刷新在进行时立即返回 `Skipped`。会阻塞当前线程，异步上下文请用 `refresh`
    pub fn reload(&self) -> Result<RefreshOutcome> {
        self.inner.reload()
    }
}

impl CsvSourceInner {
    fn records(&self) -> Option<usize> {
        self.table.load().as_deref().map(RangeTable::len)
    }

    fn set_state(&self, state: SourceState) {
        *self.state.lock() = state;
    }

    fn reload(&self) -> Result<RefreshOutcome> {
        let Some(_guard) = UpdateGuard::try_acquire(&self.updating) else {
            debug!("{}: refresh already in progress, skipping", CsvRangeSource::NAME);
            return Ok(RefreshOutcome::Skipped);
        };

        info!(
            "{}: starting data update from {}",
            CsvRangeSource::NAME,
            self.csv_path.display()
        );
        self.set_state(SourceState::Loading);

        let result = self.reload_inner();
        match &result {
            Ok(_) => self.set_state(SourceState::Ready),
            Err(e) => {
                error!("{}: data update failed: {}", CsvRangeSource::NAME, e);
                self.set_state(SourceState::Failed);
            }
        }
        result
    }

    fn reload_inner(&self) -> Result<RefreshOutcome> {
        // 1. 校验
        let validation = self.validator.validate_file(&self.csv_path);
        if !validation.is_valid {
            let metrics = self.validator.metrics();
            error!("CSV validation failed: {}", validation.message);
            for err in metrics.validation_errors.iter().take(LOGGED_VALIDATION_ERRORS) {
                warn!("  {}", err);
            }
            if metrics.validation_errors.len() > LOGGED_VALIDATION_ERRORS {
                warn!(
                    "  ... and {} more",
                    metrics.validation_errors.len() - LOGGED_VALIDATION_ERRORS
                );
            }
            return Err(GeoError::validation(validation.message));
        }

        // 2. 快照（失败不阻止加载）
        if let Err(e) = self.backup.backup() {
            warn!(
                "{}: continuing without pre-refresh snapshot: {}",
                CsvRangeSource::NAME,
                e
            );
        }
        if let Err(e) = self.backup.prune_expired() {
            warn!("{}: failed to prune old snapshots: {}", CsvRangeSource::NAME, e);
        }

        // 3. 加载并替换
        let table = RangeTable::load_csv(&self.csv_path)?;
        let records = table.len();
        self.table.store(Some(Arc::new(table)));
        *self.last_refresh.lock() = Some(Utc::now());

        let metrics = self.validator.metrics();
        info!(
            "CSV update complete. Total records: {}, Valid: {}, Invalid: {}",
            metrics.total_records, metrics.valid_records, metrics.invalid_records
        );

        Ok(RefreshOutcome::Reloaded { records })
    }
}

#[async_trait]
impl LocationSource for CsvRangeSource {
    async fn resolve(&self, ip: &str) -> Location {
        match self.inner.table.load().as_deref() {
            Some(table) => table.lookup(ip),
            None => Location::unknown(),
        }
    }

    /// 校验、快照与解析都是阻塞 IO，放到 spawn_blocking 中执行
    async fn refresh(&self) -> Result<RefreshOutcome> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.reload())
            .await
            .map_err(|e| GeoError::data_load(format!("CSV refresh task failed: {}", e)))?
    }

    /// 只要成功加载过一次段表即可用
    fn is_available(&self) -> bool {
        self.inner.table.load().is_some()
    }

    fn confidence(&self) -> f64 {
        self.inner.confidence
    }

    fn source_name(&self) -> &'static str {
        Self::NAME
    }

    fn status(&self) -> SourceStatus {
        SourceStatus {
            name: Self::NAME,
            state: self.state(),
            available: self.is_available(),
            confidence: self.inner.confidence,
            records: self.records(),
            last_refresh: *self.inner.last_refresh.lock(),
        }
    }
}
