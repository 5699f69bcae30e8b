//! System-level modules
//!
//! - Logging initialization
//! - Background scheduling of refresh, backup and cache maintenance

pub mod logging;
pub mod scheduler;

pub use logging::init_logging;
pub use scheduler::Scheduler;
