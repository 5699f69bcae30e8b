//! 数据源注册
//!
//! 根据配置组装数据源列表，列表顺序即置信度相同时的优先顺序：
//! 1. CSV 段表（始终启用）
//! 2. MaxMind 数据库（配置了 maxminddb_path 时）
//! 3. 外部 API（配置了 external_api_url 时）

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::backup::BackupManager;
use super::csv_source::CsvRangeSource;
use super::external_api::ExternalApiSource;
use super::maxmind::MaxMindSource;
use super::source::LocationSource;
use crate::config::GeoIpConfig;

/// 组装好的数据源
pub struct SourceRegistry {
    pub sources: Vec<Arc<dyn LocationSource>>,
    /// CSV 数据源的快照管理器，供定时备份任务与 CLI 使用
    pub backup: Arc<BackupManager>,
}

/// 根据 GeoIpConfig 初始化全部数据源
pub fn build_sources(config: &GeoIpConfig) -> SourceRegistry {
    let csv = CsvRangeSource::from_config(config);
    let backup = csv.backup_manager();

    let mut sources: Vec<Arc<dyn LocationSource>> = vec![Arc::new(csv)];

    if let Some(path) = config.maxminddb_path.as_deref().filter(|p| !p.is_empty()) {
        debug!("GeoIP: registering MaxMind database at {}", path);
        sources.push(Arc::new(MaxMindSource::new(path, config.maxmind_confidence)));
    }

    if let Some(url) = config.external_api_url.as_deref().filter(|u| !u.is_empty()) {
        debug!("GeoIP: registering external API {}", url);
        sources.push(Arc::new(ExternalApiSource::new(
            url,
            config.external_api_confidence,
            Duration::from_secs(config.external_api_timeout_secs),
        )));
    }

    info!(
        "GeoIP: initialized with sources [{}]",
        sources
            .iter()
            .map(|s| s.source_name())
            .collect::<Vec<_>>()
            .join(", ")
    );

    SourceRegistry { sources, backup }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_registers_csv_only() {
        let registry = build_sources(&GeoIpConfig::default());
        let names: Vec<_> = registry.sources.iter().map(|s| s.source_name()).collect();
        assert_eq!(names, vec![CsvRangeSource::NAME]);
        assert_eq!(
            registry.backup.backup_dir(),
            std::path::Path::new("backup/geoip")
        );
    }

    #[test]
    fn test_all_sources_in_registration_order() {
        let config = GeoIpConfig {
            maxminddb_path: Some("GeoLite2-City.mmdb".to_string()),
            external_api_url: Some("http://ip-api.com/json/{ip}".to_string()),
            ..GeoIpConfig::default()
        };
        let registry = build_sources(&config);
        let names: Vec<_> = registry.sources.iter().map(|s| s.source_name()).collect();
        assert_eq!(
            names,
            vec![
                CsvRangeSource::NAME,
                MaxMindSource::NAME,
                ExternalApiSource::NAME
            ]
        );
        assert!((registry.sources[1].confidence() - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_paths_are_ignored() {
        let config = GeoIpConfig {
            maxminddb_path: Some(String::new()),
            external_api_url: Some(String::new()),
            ..GeoIpConfig::default()
        };
        assert_eq!(build_sources(&config).sources.len(), 1);
    }
}
