//! Post-deployment monitoring of a database migration rollout.

pub mod alerts;
pub mod metrics;
pub mod monitor;
pub mod probes;
pub mod push;

pub use alerts::{Alert, AlertBook, EscalationPolicy, Severity};
pub use monitor::{CycleOutcome, DeployMonitorConfig, DeploymentMonitor};
pub use probes::{ApplicationProbe, DatabaseProbe, HttpApplicationProbe, PgDatabaseProbe};
