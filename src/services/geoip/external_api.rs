//! 外部 GeoIP API 实现
//!
//! 使用外部 HTTP API 进行 IP 地理位置查询（如 ip-api.com）。
//! 请求有全局超时，任何失败都返回 Unknown。结果缓存由 ResolutionEngine 负责。

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{trace, warn};
use ureq::Agent;

use super::location::{Location, UNKNOWN};
use super::source::{LocationSource, RefreshOutcome};
use crate::errors::Result;

/// 外部 API 数据源
pub struct ExternalApiSource {
    api_url_template: String,
    confidence: f64,
    agent: Agent,
}

impl ExternalApiSource {
    pub const NAME: &'static str = "EXTERNAL_API";

    /// 创建外部 API 数据源
    ///
    /// `api_url_template` 使用 `{ip}` 作为占位符
    /// 例如: `http://ip-api.com/json/{ip}`
    pub fn new(api_url_template: &str, confidence: f64, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        Self {
            api_url_template: api_url_template.to_string(),
            confidence,
            agent,
        }
    }

    /// 生成请求 URL，只接受合法的 IP 地址并使用其规范形式
    fn request_url(&self, ip: &str) -> Option<String> {
        let addr: IpAddr = ip.trim().parse().ok()?;
        Some(self.api_url_template.replace("{ip}", &addr.to_string()))
    }

    /// 从外部 API 获取地理位置（同步，在 spawn_blocking 中调用）
    fn fetch_from_api_sync(agent: &Agent, url: &str) -> Option<Location> {
        let resp = match agent.get(url).call() {
            Ok(r) => r,
            Err(e) => {
                warn!("GeoIP API request to \"{}\" failed: {}", url, e);
                return None;
            }
        };

        let json: Value = match resp.into_body().read_json() {
            Ok(j) => j,
            Err(e) => {
                warn!("GeoIP API response from \"{}\" parse failed: {}", url, e);
                return None;
            }
        };

        parse_api_response(&json)
    }
}

/// 解析 API 返回的 JSON
///
/// ip-api.com 返回格式: {"status": "success", "country": "Australia", "city": "Sydney", ...}
/// 失败时返回: {"status": "fail", ...}
/// 也支持其他 API 的常见字段名
pub fn parse_api_response(json: &Value) -> Option<Location> {
    if json["status"].as_str() == Some("fail") {
        trace!("External API returned fail status");
        return None;
    }

    let text = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| json[*k].as_str().filter(|s| !s.trim().is_empty()))
            .map(String::from)
    };
    let number = |keys: &[&str]| keys.iter().find_map(|k| json[*k].as_f64());

    let country = text(&["country", "countryCode", "country_code"])?;
    let or_unknown = |v: Option<String>| v.unwrap_or_else(|| UNKNOWN.to_string());

    Some(Location {
        country,
        city: or_unknown(text(&["city"])),
        region: or_unknown(text(&["regionName", "region"])),
        postal_code: or_unknown(text(&["zip", "postal_code", "postal"])),
        latitude: number(&["lat", "latitude"]).unwrap_or(0.0),
        longitude: number(&["lon", "longitude"]).unwrap_or(0.0),
        timezone: or_unknown(text(&["timezone", "time_zone"])),
    })
}

#[async_trait]
impl LocationSource for ExternalApiSource {
    async fn resolve(&self, ip: &str) -> Location {
        let Some(url) = self.request_url(ip) else {
            trace!("Skipping external lookup for malformed IP {:?}", ip);
            return Location::unknown();
        };
        let agent = self.agent.clone();

        // 使用 spawn_blocking 在线程池中执行同步 HTTP 请求
        tokio::task::spawn_blocking(move || Self::fetch_from_api_sync(&agent, &url))
            .await
            .unwrap_or_else(|e| {
                warn!("GeoIP spawn_blocking failed: {}", e);
                None
            })
            .unwrap_or_else(Location::unknown)
    }

    async fn refresh(&self) -> Result<RefreshOutcome> {
        Ok(RefreshOutcome::Unchanged)
    }

    fn is_available(&self) -> bool {
        true
    }

    fn confidence(&self) -> f64 {
        self.confidence
    }

    fn source_name(&self) -> &'static str {
        Self::NAME
    }
}
