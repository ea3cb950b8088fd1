use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub scans: i64,
    pub tuples_read: i64,
    pub tuples_fetched: i64,
}

/// One cycle's view of the database
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseMetrics {
    pub connectivity: bool,
    pub active_connections: i64,
    pub watched_table_exists: bool,
    pub live_tuples: Option<i64>,
    pub dead_tuples: Option<i64>,
    pub table_size: Option<String>,
    pub table_size_bytes: Option<i64>,
    pub slow_queries: i64,
    pub index_stats: BTreeMap<String, IndexStats>,
    pub error: Option<String>,
}

impl DatabaseMetrics {
    pub fn unreachable(error: impl Into<String>) -> Self {
        Self {
            connectivity: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// One cycle's view of the watched service's HTTP surface
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationMetrics {
    pub service_health: bool,
    pub service_response_time_secs: Option<f64>,
    pub api_available: bool,
    pub api_response_time_secs: Option<f64>,
    pub api_returns_data: bool,
}

/// Pre-deployment reference point for regression alerts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Baseline {
    pub active_connections: i64,
    pub live_tuples: BTreeMap<String, i64>,
    pub dead_tuples: BTreeMap<String, i64>,
}
