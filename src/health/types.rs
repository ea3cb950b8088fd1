use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
    Unknown,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
            HealthStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Auth,
    Ability,
    Combat,
    Economy,
    Matchmaking,
    WorldEvents,
    Other,
}

fn default_health_endpoint() -> String {
    "/health".to_string()
}

fn default_true() -> bool {
    true
}

/// A monitored backend service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceTarget {
    pub name: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: ServiceKind,
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    #[serde(default = "default_health_endpoint")]
    pub health_endpoint: String,
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default = "default_true")]
    pub check_database: bool,
    #[serde(default = "default_true")]
    pub check_cache: bool,
}

fn default_kind() -> ServiceKind {
    ServiceKind::Other
}

fn default_host() -> String {
    "localhost".to_string()
}

impl ServiceTarget {
    pub fn new(name: &str, kind: ServiceKind, port: u16, endpoints: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind,
            host: default_host(),
            port,
            health_endpoint: default_health_endpoint(),
            endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
            check_database: true,
            check_cache: true,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Prefix used for `<PREFIX>_SERVICE_HOST` / `<PREFIX>_SERVICE_PORT` overrides.
    /// `world-events-service` -> `WORLD_EVENTS`
    pub fn env_prefix(&self) -> String {
        self.name
            .trim_end_matches("-service")
            .replace('-', "_")
            .to_uppercase()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointCheck {
    pub service_name: String,
    pub service_kind: ServiceKind,
    pub endpoint: String,
    pub status: HealthStatus,
    pub response_time_ms: f64,
    pub last_check: DateTime<Utc>,
    pub error_message: Option<String>,
    pub metrics: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlowQuery {
    pub query: String,
    pub duration_ms: f64,
    pub username: Option<String>,
    pub client_addr: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseHealth {
    pub connections_active: i64,
    pub connections_idle: i64,
    pub connections_total: i64,
    pub query_avg_time_ms: f64,
    pub slowest_queries: Vec<SlowQuery>,
    pub status: HealthStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheHealth {
    pub memory_used_mb: f64,
    pub memory_peak_mb: f64,
    pub connections_active: i64,
    pub hit_rate_percent: f64,
    pub eviction_rate: f64,
    pub status: HealthStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub service_name: String,
    pub overall_status: HealthStatus,
    pub api_checks: Vec<EndpointCheck>,
    pub database_health: Option<DatabaseHealth>,
    pub cache_health: Option<CacheHealth>,
    pub uptime_seconds: f64,
    pub last_incident: Option<DateTime<Utc>>,
}

impl ServiceHealth {
    pub fn unknown(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            overall_status: HealthStatus::Unknown,
            api_checks: Vec::new(),
            database_health: None,
            cache_health: None,
            uptime_seconds: 0.0,
            last_incident: None,
        }
    }

    /// Recorded when the check task itself failed
    pub fn failed(service_name: &str, at: DateTime<Utc>) -> Self {
        Self {
            overall_status: HealthStatus::Critical,
            last_incident: Some(at),
            ..Self::unknown(service_name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSummary {
    pub total_services: usize,
    pub healthy_services: usize,
    pub warning_services: usize,
    pub critical_services: usize,
    pub overall_status: HealthStatus,
    pub health_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub timestamp: DateTime<Utc>,
    pub monitor_uptime_seconds: f64,
    pub services: std::collections::BTreeMap<String, ServiceHealth>,
    pub summary: HealthSummary,
}
