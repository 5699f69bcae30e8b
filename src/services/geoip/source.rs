//! LocationSource 抽象层
//!
//! 任意数量的定位数据源，各自报告可用性、固定的置信度权重，并支持显式刷新。
//! 新增数据源只需实现该 trait 并注册到 [`build_sources`](super::build_sources)，
//! 不需要修改 [`ResolutionEngine`](super::ResolutionEngine)。

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{AsRefStr, Display};

use super::location::Location;
use crate::errors::Result;

/// 数据源生命周期状态
///
/// `Uninitialized → Loading → Ready`，之后每次刷新 `→ Loading → Ready`，
/// 刷新失败进入 `Failed`（仍然保留上一次成功加载的数据）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SourceState {
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

/// 单次刷新的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// 数据已重新加载
    Reloaded { records: usize },
    /// 数据文件已重新打开，该数据源没有记录数的概念
    Reopened,
    /// 已有刷新在进行中，本次直接返回
    Skipped,
    /// 数据源没有可刷新的内容
    Unchanged,
}

/// 数据源状态快照（用于日志与 CLI 展示）
#[derive(Debug, Clone, Serialize)]
pub struct SourceStatus {
    pub name: &'static str,
    pub state: SourceState,
    pub available: bool,
    pub confidence: f64,
    /// 当前生效的记录数，无此概念的数据源为 None
    pub records: Option<usize>,
    pub last_refresh: Option<DateTime<Utc>>,
}

/// 定位数据源 trait
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// 查询 IP 地址的地理位置，查不到时返回 Unknown
    async fn resolve(&self, ip: &str) -> Location;

    /// 重新加载数据源
    ///
    /// 并发调用时最多只有一次真正执行，其余返回 [`RefreshOutcome::Skipped`]
    async fn refresh(&self) -> Result<RefreshOutcome>;

    fn is_available(&self) -> bool;

    /// 固定的置信度权重
    fn confidence(&self) -> f64;

    /// 获取数据源名称（用于日志）
    fn source_name(&self) -> &'static str;

    fn status(&self) -> SourceStatus {
        SourceStatus {
            name: self.source_name(),
            state: if self.is_available() {
                SourceState::Ready
            } else {
                SourceState::Uninitialized
            },
            available: self.is_available(),
            confidence: self.confidence(),
            records: None,
            last_refresh: None,
        }
    }
}

/// 刷新中标记，离开作用域时自动清除
pub(crate) struct UpdateGuard<'a>(&'a AtomicBool);

impl<'a> UpdateGuard<'a> {
    pub(crate) fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_guard_is_exclusive() {
        let flag = AtomicBool::new(false);
        let guard = UpdateGuard::try_acquire(&flag).unwrap();
        assert!(UpdateGuard::try_acquire(&flag).is_none());
        drop(guard);
        assert!(!flag.load(Ordering::Acquire));
        assert!(UpdateGuard::try_acquire(&flag).is_some());
    }

    #[test]
    fn test_refresh_outcome_serialization() {
        assert_eq!(
            serde_json::to_string(&RefreshOutcome::Reopened).unwrap(),
            "\"reopened\""
        );
        assert_eq!(
            serde_json::to_string(&RefreshOutcome::Reloaded { records: 3 }).unwrap(),
            r#"{"reloaded":{"records":3}}"#
        );
    }

    #[test]
    fn test_source_state_display() {
        assert_eq!(SourceState::Uninitialized.to_string(), "uninitialized");
        assert_eq!(SourceState::Ready.as_ref(), "ready");
    }
}
