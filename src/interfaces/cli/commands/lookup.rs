//! Lookup command - one-shot resolution

use serde::Serialize;

use super::load_engine;
use crate::config::StaticConfig;
use crate::interfaces::cli::CliError;
use crate::services::geoip::Location;

/// 一行输出：IP 与解析结果平铺在同一个 JSON 对象中
#[derive(Debug, Serialize)]
pub struct ResolvedLocation<'a> {
    pub ip: &'a str,
    #[serde(flatten)]
    pub location: Location,
}

impl ResolvedLocation<'_> {
    pub fn to_json(&self, pretty: bool) -> Result<String, CliError> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}

/// Resolve each IP and print one JSON object per address
pub async fn lookup_ips(config: &StaticConfig, ips: &[String], pretty: bool) -> Result<(), CliError> {
    let (engine, _registry, _report) = load_engine(&config.geoip).await;

    for ip in ips {
        let ip = ip.trim();
        let location = engine.resolve(ip).await;
        println!("{}", ResolvedLocation { ip, location }.to_json(pretty)?);
    }

    Ok(())
}
