//! Service layer
//!
//! Business logic shared by the CLI commands and the background scheduler.

pub mod geoip;

pub use geoip::{Location, LocationSource, ResolutionEngine, build_sources};
