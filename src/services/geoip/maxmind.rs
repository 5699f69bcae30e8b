//! MaxMind GeoLite2 数据库实现
//!
//! 使用本地 MaxMind GeoLite2-City.mmdb 文件进行 IP 地理位置查询，支持 IPv4 与 IPv6

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use maxminddb::Reader;
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use super::location::{Location, UNKNOWN};
use super::source::{LocationSource, RefreshOutcome, SourceState, SourceStatus, UpdateGuard};
use crate::errors::{GeoError, Result};

/// MaxMind 数据源
///
/// 刷新时重新打开数据库文件并原子替换 Reader，打开失败则继续使用旧的 Reader
pub struct MaxMindSource {
    path: PathBuf,
    confidence: f64,
    reader: ArcSwapOption<Reader<Vec<u8>>>,
    state: Mutex<SourceState>,
    last_refresh: Mutex<Option<DateTime<Utc>>>,
    updating: AtomicBool,
}

impl MaxMindSource {
    pub const NAME: &'static str = "MAXMIND";

    pub fn new(path: impl Into<PathBuf>, confidence: f64) -> Self {
        Self {
            path: path.into(),
            confidence,
            reader: ArcSwapOption::empty(),
            state: Mutex::new(SourceState::Uninitialized),
            last_refresh: Mutex::new(None),
            updating: AtomicBool::new(false),
        }
    }

    fn lookup(reader: &Reader<Vec<u8>>, ip: &str) -> Option<Location> {
        let ip_addr: IpAddr = ip.trim().parse().ok()?;

        let result = reader.lookup(ip_addr).ok()?;
        let city: maxminddb::geoip2::City = result.decode().ok()??;

        let country = city
            .country
            .names
            .english
            .or(city.country.iso_code)?
            .to_string();
        let field = |value: Option<&str>| value.unwrap_or(UNKNOWN).to_string();

        let location = Location {
            country,
            city: field(city.city.names.english),
            region: field(
                city.subdivisions
                    .first()
                    .and_then(|s| s.names.english),
            ),
            postal_code: field(city.postal.code),
            latitude: city.location.latitude.unwrap_or(0.0),
            longitude: city.location.longitude.unwrap_or(0.0),
            timezone: field(city.location.time_zone),
        };

        trace!(
            "MaxMind lookup for {}: country={}, city={}",
            ip, location.country, location.city
        );

        Some(location)
    }
}

#[async_trait]
impl LocationSource for MaxMindSource {
    async fn resolve(&self, ip: &str) -> Location {
        match self.reader.load().as_deref() {
            Some(reader) => Self::lookup(reader, ip).unwrap_or_else(Location::unknown),
            None => Location::unknown(),
        }
    }

    async fn refresh(&self) -> Result<RefreshOutcome> {
        let Some(_guard) = UpdateGuard::try_acquire(&self.updating) else {
            debug!("{}: refresh already in progress, skipping", Self::NAME);
            return Ok(RefreshOutcome::Skipped);
        };

        *self.state.lock() = SourceState::Loading;
        // 打开数据库会读入整个文件，放到阻塞线程池
        let path = self.path.clone();
        let opened = tokio::task::spawn_blocking(move || Reader::open_readfile(path))
            .await
            .map_err(|e| GeoError::data_load(format!("MaxMind refresh task failed: {}", e)));

        match opened {
            Ok(Ok(reader)) => {
                let build_epoch = reader.metadata.build_epoch;
                self.reader.store(Some(Arc::new(reader)));
                *self.state.lock() = SourceState::Ready;
                *self.last_refresh.lock() = Some(Utc::now());
                info!(
                    "{}: loaded database {} (build epoch {})",
                    Self::NAME,
                    self.path.display(),
                    build_epoch
                );
                Ok(RefreshOutcome::Reopened)
            }
            Ok(Err(e)) => {
                warn!(
                    "{}: failed to open database {}: {}",
                    Self::NAME,
                    self.path.display(),
                    e
                );
                *self.state.lock() = SourceState::Failed;
                Err(e.into())
            }
            Err(e) => {
                *self.state.lock() = SourceState::Failed;
                Err(e)
            }
        }
    }

    fn is_available(&self) -> bool {
        self.reader.load().is_some()
    }

    fn confidence(&self) -> f64 {
        self.confidence
    }

    fn source_name(&self) -> &'static str {
        Self::NAME
    }

    fn status(&self) -> SourceStatus {
        SourceStatus {
            name: Self::NAME,
            state: *self.state.lock(),
            available: self.is_available(),
            confidence: self.confidence,
            records: None,
            last_refresh: *self.last_refresh.lock(),
        }
    }
}
