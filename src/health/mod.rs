//! Service health monitoring: concurrent HTTP probes plus shared database
//! and cache checks, folded into a JSON report.

pub mod cache;
pub mod checks;
pub mod database;
pub mod monitor;
pub mod status;
pub mod types;

pub use monitor::HealthMonitor;
pub use types::{HealthReport, HealthStatus, ServiceHealth, ServiceTarget};
