use crate::constants;
use crate::error::{OpsError, Result};
use crate::health::types::{ServiceKind, ServiceTarget};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OpsConfig {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub health: HealthConfig,
    pub alerts: AlertConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            name: "necpgame".to_string(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
        }
    }
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.name)
            .username(&self.user)
            .password(&self.password)
    }

    /// Small pool: every tool runs a handful of sequential queries
    pub async fn connect(&self) -> Result<PgPool> {
        info!("Connecting to PostgreSQL at {}:{}/{}", self.host, self.port, self.name);
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(self.connect_options())
            .await?;
        Ok(pool)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
        }
    }
}

impl RedisConfig {
    pub fn connection_info(&self) -> redis::ConnectionInfo {
        redis::ConnectionInfo {
            addr: redis::ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: redis::RedisConnectionInfo::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub interval_secs: u64,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub report_path: String,
    pub healthy_response_ms: f64,
    pub warning_response_ms: f64,
    pub services: Vec<ServiceTarget>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_secs: constants::HEALTH_INTERVAL_SECS,
            request_timeout_secs: constants::HEALTH_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: constants::HEALTH_CONNECT_TIMEOUT_SECS,
            report_path: constants::HEALTH_REPORT_FILE.to_string(),
            healthy_response_ms: constants::RESPONSE_HEALTHY_MS,
            warning_response_ms: constants::RESPONSE_WARNING_MS,
            services: default_services(),
        }
    }
}

impl HealthConfig {
    /// Replace or add services from a JSON override file keyed by service name.
    pub fn merge_overrides(&mut self, path: &Path) -> Result<usize> {
        let content = fs::read_to_string(path)?;
        let overrides: std::collections::BTreeMap<String, ServiceOverride> =
            serde_json::from_str(&content)?;
        let count = overrides.len();
        for (name, ov) in overrides {
            let target = ov.into_target(&name);
            match self.services.iter_mut().find(|s| s.name == name) {
                Some(existing) => *existing = target,
                None => self.services.push(target),
            }
        }
        debug!("Merged {} service overrides from {}", count, path.display());
        Ok(count)
    }
}

/// Override entry in `health_config.json`; the service name is the map key
#[derive(Debug, Deserialize)]
struct ServiceOverride {
    #[serde(rename = "type", default)]
    kind: Option<ServiceKind>,
    #[serde(default)]
    host: Option<String>,
    port: u16,
    #[serde(default)]
    health_endpoint: Option<String>,
    #[serde(default)]
    endpoints: Vec<String>,
    #[serde(default)]
    check_database: Option<bool>,
    #[serde(default)]
    check_cache: Option<bool>,
}

impl ServiceOverride {
    fn into_target(self, name: &str) -> ServiceTarget {
        let mut target = ServiceTarget::new(name, self.kind.unwrap_or(ServiceKind::Other), self.port, &[]);
        if let Some(host) = self.host {
            target.host = host;
        }
        if let Some(ep) = self.health_endpoint {
            target.health_endpoint = ep;
        }
        target.endpoints = self.endpoints;
        target.check_database = self.check_database.unwrap_or(true);
        target.check_cache = self.check_cache.unwrap_or(true);
        target
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub pushgateway_url: Option<String>,
    pub webhook_url: Option<String>,
}

pub fn default_services() -> Vec<ServiceTarget> {
    vec![
        ServiceTarget::new(
            "auth-service",
            ServiceKind::Auth,
            8080,
            &["/auth/health", "/auth/health/ws", "/auth/sessions/stats"],
        ),
        ServiceTarget::new(
            "ability-service",
            ServiceKind::Ability,
            8081,
            &["/ability/health", "/ability/combat-abilities"],
        ),
        ServiceTarget::new(
            "combat-service",
            ServiceKind::Combat,
            8084,
            &["/combat/health", "/combat/health/ws"],
        ),
        ServiceTarget::new(
            "economy-service",
            ServiceKind::Economy,
            8083,
            &["/economy/health", "/economy/bazaar-bots"],
        ),
        ServiceTarget::new(
            "matchmaking-service",
            ServiceKind::Matchmaking,
            8082,
            &["/matchmaking/health"],
        ),
    ]
}

impl OpsConfig {
    /// Load from an explicit TOML file, or `gameops.toml` when present, then
    /// apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = Path::new(constants::DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            OpsError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config: OpsConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup. Unparseable ports are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DB_HOST") {
            self.database.host = v;
        }
        if let Some(v) = lookup("DB_PORT").and_then(|p| p.parse().ok()) {
            self.database.port = v;
        }
        if let Some(v) = lookup("DB_NAME") {
            self.database.name = v;
        }
        if let Some(v) = lookup("DB_USER") {
            self.database.user = v;
        }
        if let Some(v) = lookup("DB_PASSWORD") {
            self.database.password = v;
        }
        if let Some(v) = lookup("REDIS_HOST") {
            self.redis.host = v;
        }
        if let Some(v) = lookup("REDIS_PORT").and_then(|p| p.parse().ok()) {
            self.redis.port = v;
        }
        if let Some(v) = lookup("GAMEOPS_PUSHGATEWAY_URL").filter(|v| !v.trim().is_empty()) {
            self.alerts.pushgateway_url = Some(v);
        }
        if let Some(v) = lookup("GAMEOPS_ALERT_WEBHOOK").filter(|v| !v.trim().is_empty()) {
            self.alerts.webhook_url = Some(v);
        }
        for service in &mut self.health.services {
            let prefix = service.env_prefix();
            if let Some(host) = lookup(&format!("{prefix}_SERVICE_HOST")) {
                service.host = host;
            }
            if let Some(port) = lookup(&format!("{prefix}_SERVICE_PORT")).and_then(|p| p.parse().ok()) {
                service.port = port;
            }
        }
    }
}
