//! 后台定时任务
//!
//! 三个互相独立的循环：
//! - 数据刷新：按 `scheduler.refresh` 节奏调用 `ResolutionEngine::refresh_all`
//! - 快照备份：按 `scheduler.backup` 节奏创建快照并清理过期快照
//! - 缓存维护：固定间隔执行 `ResolutionEngine::maintain_cache`
//!
//! 任务都在 tokio 上运行，不会阻塞 `resolve`。

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::errors::Result;
use crate::services::geoip::{BackupManager, ResolutionEngine};
use crate::utils::schedule::Schedule;

/// 运行中的定时任务，`shutdown` 或 drop 时全部取消
pub struct Scheduler {
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl Scheduler {
    /// 解析配置中的节奏表达式并启动全部任务
    pub fn start(
        engine: Arc<ResolutionEngine>,
        backup: Arc<BackupManager>,
        config: &SchedulerConfig,
    ) -> Result<Self> {
        let refresh: Schedule = config.refresh.parse()?;
        let backup_schedule: Schedule = config.backup.parse()?;
        let maintenance = Duration::from_secs(config.cache_maintenance_interval_secs.max(1));

        let handles = vec![
            ("refresh", spawn_refresh_task(Arc::clone(&engine), refresh)),
            ("backup", spawn_backup_task(backup, backup_schedule)),
            (
                "cache_maintenance",
                spawn_cache_maintenance_task(engine, maintenance),
            ),
        ];

        info!(
            "Scheduler started (refresh: {}, backup: {}, cache maintenance: every {}s)",
            refresh,
            backup_schedule,
            maintenance.as_secs()
        );

        Ok(Self { handles })
    }

    pub fn is_running(&self) -> bool {
        self.handles.iter().any(|(_, h)| !h.is_finished())
    }

    /// 取消所有任务并等待其退出
    pub async fn shutdown(mut self) {
        for (name, handle) in self.handles.drain(..) {
            handle.abort();
            match handle.await {
                Err(e) if e.is_panic() => error!("Scheduled task '{}' panicked: {}", name, e),
                _ => debug!("Scheduled task '{}' stopped", name),
            }
        }
        info!("Scheduler stopped");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for (_, handle) in &self.handles {
            handle.abort();
        }
    }
}

/// 按节奏循环执行 `job`，每次执行前重新计算等待时间
fn spawn_scheduled<F, Fut>(name: &'static str, schedule: Schedule, mut job: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let delay = schedule.next_delay(&Local::now());
            debug!("Next '{}' run in {}s", name, delay.as_secs());
            tokio::time::sleep(delay).await;
            job().await;
        }
    })
}

fn spawn_refresh_task(engine: Arc<ResolutionEngine>, schedule: Schedule) -> JoinHandle<()> {
    spawn_scheduled("refresh", schedule, move || {
        let engine = Arc::clone(&engine);
        async move {
            info!("Starting scheduled location data update");
            let report = engine.refresh_all().await;
            if !report.all_succeeded() {
                warn!(
                    "Scheduled update finished with {} failed source(s)",
                    report.failed().count()
                );
            }
        }
    })
}

fn spawn_backup_task(backup: Arc<BackupManager>, schedule: Schedule) -> JoinHandle<()> {
    spawn_scheduled("backup", schedule, move || {
        let backup = Arc::clone(&backup);
        async move {
            let result = tokio::task::spawn_blocking(move || run_backup_cycle(&backup)).await;
            if let Err(e) = result {
                error!("Scheduled backup task failed: {}", e);
            }
        }
    })
}

/// 一次完整的备份周期：创建快照，然后清理过期快照
pub fn run_backup_cycle(backup: &BackupManager) {
    match backup.backup() {
        Ok(path) => info!("Scheduled backup created: {}", path.display()),
        Err(e) => error!("Scheduled backup failed: {}", e),
    }
    match backup.prune_expired() {
        Ok(0) => debug!("No expired snapshots to prune"),
        Ok(removed) => info!("Pruned {} expired snapshot(s)", removed),
        Err(e) => error!("Failed to prune snapshots: {}", e),
    }
}

fn spawn_cache_maintenance_task(
    engine: Arc<ResolutionEngine>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 第一次 tick 立即返回，跳过
        ticker.tick().await;

        loop {
            ticker.tick().await;
            engine.maintain_cache().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::geoip::LocationSource;
    use std::fs;
    use tempfile::TempDir;

    fn config(refresh: &str, backup: &str) -> SchedulerConfig {
        SchedulerConfig {
            refresh: refresh.to_string(),
            backup: backup.to_string(),
            cache_maintenance_interval_secs: 1,
            refresh_on_startup: false,
        }
    }

    #[tokio::test]
    async fn test_invalid_schedule_is_rejected() {
        let dir = TempDir::new().unwrap();
        let engine = Arc::new(ResolutionEngine::new(
            Vec::<Arc<dyn LocationSource>>::new(),
            10,
        ));
        let backup = Arc::new(BackupManager::new(
            dir.path().join("ip-ranges.csv"),
            dir.path().join("backup"),
            7,
        ));

        assert!(
            Scheduler::start(
                Arc::clone(&engine),
                Arc::clone(&backup),
                &config("soon", "00:00")
            )
            .is_err()
        );
        assert!(Scheduler::start(engine, backup, &config("01:00", "99:99")).is_err());
    }

    #[tokio::test]
    async fn test_backup_task_runs_on_interval() {
        let dir = TempDir::new().unwrap();
        let csv = dir.path().join("ip-ranges.csv");
        fs::write(&csv, "ip_start,ip_end\n").unwrap();
        let backup = Arc::new(BackupManager::new(&csv, dir.path().join("backup"), 7));
        let engine = Arc::new(ResolutionEngine::new(Vec::<Arc<dyn LocationSource>>::new(), 10));

        let scheduler = Scheduler::start(engine, Arc::clone(&backup), &config("1d", "1s")).unwrap();
        assert!(scheduler.is_running());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        scheduler.shutdown().await;

        assert!(!backup.list_snapshots().unwrap().is_empty());
    }

    #[test]
    fn test_backup_cycle_tolerates_missing_source() {
        let dir = TempDir::new().unwrap();
        let backup = BackupManager::new(
            dir.path().join("missing.csv"),
            dir.path().join("backup"),
            7,
        );
        run_backup_cycle(&backup);
        assert!(backup.list_snapshots().unwrap().is_empty());
    }
}
