//! geoip-resolver - Confidence-weighted IP geolocation resolver
//!
//! This library resolves IP addresses to locations by querying several
//! location sources and keeping the answer with the highest confidence.
//!
//! # Architecture
//! - `services::geoip`: range table, validator, snapshots, sources and the resolution engine
//! - `system`: logging and the background scheduler
//! - `config`: Configuration management (TOML + environment)
//! - `interfaces`: Command-line interface
//! - `utils`: Cadence expression parsing

pub mod cli;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod services;
pub mod system;
pub mod utils;
