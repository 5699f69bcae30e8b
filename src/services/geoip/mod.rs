//! GeoIP 解析服务
//!
//! 提供 IP 地址地理位置解析功能，支持：
//! - CSV IP 段表（校验、快照、原子替换）
//! - MaxMind GeoLite2 本地数据库
//! - 外部 HTTP API
//!
//! 多个数据源的结果由 [`ResolutionEngine`] 按置信度合并并缓存。

mod backup;
mod csv_source;
mod engine;
mod external_api;
mod location;
mod maxmind;
mod provider;
mod range_table;
mod source;
mod validator;

pub use backup::{BackupManager, Snapshot};
pub use csv_source::CsvRangeSource;
pub use engine::{DEFAULT_MAX_CACHE_SIZE, RefreshReport, ResolutionEngine, SourceRefreshResult};
pub use external_api::{ExternalApiSource, parse_api_response};
pub use location::{Location, UNKNOWN};
pub use maxmind::MaxMindSource;
pub use provider::{SourceRegistry, build_sources};
pub use range_table::{EXPECTED_HEADER, IpRange, RangeTable, parse_ipv4};
pub use source::{LocationSource, RefreshOutcome, SourceState, SourceStatus};
pub use validator::{DataQualityMetrics, DataValidator, INVALID_HEADER_MESSAGE, ValidationResult};
