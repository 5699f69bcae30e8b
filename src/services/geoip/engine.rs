//! 多数据源解析引擎
//!
//! 查询流程：
//! 1. 命中缓存直接返回
//! 2. 未命中时并发查询所有可用数据源，丢弃 Unknown 结果
//! 3. 选择置信度最高的结果（相同置信度取注册顺序靠前者），全部落空则返回 Unknown
//! 4. 结果（包括 Unknown）写入缓存，直到下一次 refresh_all 或被淘汰
//!
//! 缓存基于 moka，同一个 IP 的并发未命中只会触发一次数据源查询。
//! 缓存键带上数据代数，refresh_all 完成后代数加一，刷新前开始的查询即使晚于
//! 清空才写入缓存，也不会再被读到。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use moka::future::Cache;
use serde::Serialize;
use tracing::{debug, error, info, trace};

use super::location::Location;
use super::provider::{SourceRegistry, build_sources};
use super::source::{LocationSource, RefreshOutcome, SourceStatus};
use crate::config::GeoIpConfig;

/// 默认缓存上限
pub const DEFAULT_MAX_CACHE_SIZE: u64 = 10_000;

/// 单个数据源的刷新结果
#[derive(Debug, Clone, Serialize)]
pub struct SourceRefreshResult {
    pub source: &'static str,
    pub outcome: Result<RefreshOutcome, String>,
}

/// 一次 refresh_all 的汇总
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub results: Vec<SourceRefreshResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RefreshReport {
    pub fn failed(&self) -> impl Iterator<Item = &SourceRefreshResult> {
        self.results.iter().filter(|r| r.outcome.is_err())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed().next().is_none()
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// 缓存键：(数据代数, IP)
type CacheKey = (u64, String);

pub struct ResolutionEngine {
    sources: Vec<Arc<dyn LocationSource>>,
    cache: Cache<CacheKey, Location>,
    generation: AtomicU64,
    max_cache_size: u64,
}

impl ResolutionEngine {
    /// `sources` 的顺序即置信度相同时的优先顺序
    pub fn new(sources: Vec<Arc<dyn LocationSource>>, max_cache_size: u64) -> Self {
        let cache = Cache::builder().max_capacity(max_cache_size).build();
        debug!(
            "ResolutionEngine created with {} sources, cache capacity {}",
            sources.len(),
            max_cache_size
        );
        Self {
            sources,
            cache,
            generation: AtomicU64::new(0),
            max_cache_size,
        }
    }

    pub fn from_registry(registry: &SourceRegistry, max_cache_size: u64) -> Self {
        Self::new(registry.sources.clone(), max_cache_size)
    }

    /// 根据配置组装数据源并创建引擎，同时返回注册表（供备份任务使用）
    pub fn from_config(config: &GeoIpConfig) -> (Self, SourceRegistry) {
        let registry = build_sources(config);
        let engine = Self::from_registry(&registry, config.max_cache_size);
        (engine, registry)
    }

    pub fn sources(&self) -> &[Arc<dyn LocationSource>] {
        &self.sources
    }

    pub fn max_cache_size(&self) -> u64 {
        self.max_cache_size
    }

    /// 解析 IP 地址的地理位置，永远不会失败
    pub async fn resolve(&self, ip: &str) -> Location {
        let key = (self.generation(), ip.to_string());
        self.cache.get_with(key, self.resolve_uncached(ip)).await
    }

    /// 当前数据代数，每次 refresh_all 完成数据源刷新后加一
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// 绕过缓存查询所有可用数据源
    pub async fn resolve_uncached(&self, ip: &str) -> Location {
        trace!("Cache miss for {}, querying sources", ip);

        let available: Vec<&Arc<dyn LocationSource>> =
            self.sources.iter().filter(|s| s.is_available()).collect();
        if available.is_empty() {
            debug!("No available location source for {}", ip);
            return Location::unknown();
        }

        let results = join_all(available.iter().map(|s| s.resolve(ip))).await;

        // 严格大于才替换，相同置信度保留先注册的结果
        let mut best: Option<(f64, &'static str, Location)> = None;
        for (source, location) in available.iter().zip(results) {
            if location.is_unknown() {
                continue;
            }
            let confidence = source.confidence();
            if best.as_ref().is_none_or(|(c, _, _)| confidence > *c) {
                best = Some((confidence, source.source_name(), location));
            }
        }

        match best {
            Some((confidence, name, location)) => {
                trace!(
                    "Resolved {} via {} (confidence {}): {}, {}",
                    ip, name, confidence, location.country, location.city
                );
                location
            }
            None => Location::unknown(),
        }
    }

    /// 依次刷新所有数据源，然后推进数据代数并清空缓存
    ///
    /// 单个数据源失败只记录日志，不影响其它数据源
    pub async fn refresh_all(&self) -> RefreshReport {
        let started_at = Utc::now();
        info!("Refreshing {} location sources", self.sources.len());

        let mut results = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let name = source.source_name();
            let outcome = match source.refresh().await {
                Ok(outcome) => {
                    debug!("Source {} refreshed: {:?}", name, outcome);
                    Ok(outcome)
                }
                Err(e) => {
                    error!("Failed to refresh source {}: {}", name, e);
                    Err(e.to_string())
                }
            };
            results.push(SourceRefreshResult {
                source: name,
                outcome,
            });
        }

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("Location data generation advanced to {}", generation);
        self.clear_cache().await;

        let report = RefreshReport {
            results,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            "All location sources refreshed in {}ms ({} failed)",
            report.duration_ms(),
            report.failed().count()
        );
        report
    }

    /// 清空缓存
    pub async fn clear_cache(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        debug!("Location cache cleared");
    }

    /// 定期缓存维护：执行挂起的淘汰任务并记录缓存大小
    pub async fn maintain_cache(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        let size = self.cache.entry_count();
        info!(
            "Location cache maintenance: {} entries (capacity {})",
            size, self.max_cache_size
        );
        size
    }

    /// 当前缓存条目数（淘汰是异步执行的，可能短暂超过上限）
    pub fn cache_size(&self) -> u64 {
        self.cache.entry_count()
    }

    pub fn status(&self) -> Vec<SourceStatus> {
        self.sources.iter().map(|s| s.status()).collect()
    }
}
