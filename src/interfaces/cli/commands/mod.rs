//! CLI command implementations

pub mod backup;
mod config_gen;
mod lookup;
mod serve;
mod status;
mod validate;

pub use config_gen::config_generate;
pub use lookup::{ResolvedLocation, lookup_ips};
pub use serve::serve;
pub use status::source_status;
pub use validate::validate_file;

use crate::config::GeoIpConfig;
use crate::services::geoip::{RefreshReport, ResolutionEngine, SourceRegistry};

/// 组装数据源并立即加载一次
async fn load_engine(config: &GeoIpConfig) -> (ResolutionEngine, SourceRegistry, RefreshReport) {
    let (engine, registry) = ResolutionEngine::from_config(config);
    let report = engine.refresh_all().await;
    (engine, registry, report)
}
