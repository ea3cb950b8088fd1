use super::cache::check_cache;
use super::checks::EndpointProber;
use super::database::check_database;
use super::status::{overall_status, summarize, ResponseThresholds};
use super::types::{
    CacheHealth, DatabaseHealth, HealthReport, HealthStatus, ServiceHealth, ServiceTarget,
};
use crate::config::{HealthConfig, RedisConfig};
use crate::error::Result;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use metrics::gauge;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::task::JoinError;
use tracing::{error, info, instrument, warn};

/// Carry uptime and incident tracking over from the previous observation.
///
/// Uptime grows by one poll interval per observation. An incident is stamped
/// when a service that was healthy last cycle no longer is.
pub fn carry_forward(
    mut current: ServiceHealth,
    previous: Option<&ServiceHealth>,
    interval_secs: f64,
    now: DateTime<Utc>,
) -> ServiceHealth {
    match previous {
        Some(prev) => {
            current.uptime_seconds = prev.uptime_seconds + interval_secs;
            current.last_incident = if prev.overall_status == HealthStatus::Healthy
                && current.overall_status != HealthStatus::Healthy
            {
                Some(now)
            } else {
                current.last_incident.or(prev.last_incident)
            };
        }
        None => current.uptime_seconds = interval_secs,
    }
    current
}

/// One service's API checks combined with this cycle's shared backend results
pub async fn check_service(
    prober: &EndpointProber,
    target: &ServiceTarget,
    database: Option<DatabaseHealth>,
    cache: Option<CacheHealth>,
) -> ServiceHealth {
    info!("Checking health for {}", target.name);
    let mut health = ServiceHealth::unknown(&target.name);
    health.api_checks = prober.check_api_endpoints(target).await;
    health.database_health = database;
    health.cache_health = cache;
    health.overall_status = overall_status(&health);
    health
}

pub struct HealthMonitor {
    config: HealthConfig,
    prober: EndpointProber,
    database: Option<PgPool>,
    redis: Option<RedisConfig>,
    health_data: BTreeMap<String, ServiceHealth>,
    started: Instant,
}

impl HealthMonitor {
    pub fn new(config: HealthConfig) -> Result<Self> {
        let prober = EndpointProber::new(
            Duration::from_secs(config.request_timeout_secs),
            Duration::from_secs(config.connect_timeout_secs),
            ResponseThresholds {
                healthy_ms: config.healthy_response_ms,
                warning_ms: config.warning_response_ms,
            },
        )?;
        Ok(Self {
            config,
            prober,
            database: None,
            redis: None,
            health_data: BTreeMap::new(),
            started: Instant::now(),
        })
    }

    /// Enable `pg_stat_activity` checks for services that ask for them
    pub fn with_database(mut self, pool: PgPool) -> Self {
        self.database = Some(pool);
        self
    }

    /// Enable Redis checks for services that ask for them
    pub fn with_cache(mut self, redis: RedisConfig) -> Self {
        self.redis = Some(redis);
        self
    }

    pub fn services(&self) -> &[ServiceTarget] {
        &self.config.services
    }

    pub fn health_data(&self) -> &BTreeMap<String, ServiceHealth> {
        &self.health_data
    }

    async fn shared_backends(&self) -> (Option<DatabaseHealth>, Option<CacheHealth>) {
        let wants_db = self.config.services.iter().any(|s| s.check_database);
        let wants_cache = self.config.services.iter().any(|s| s.check_cache);

        let db = match (&self.database, wants_db) {
            (Some(pool), true) => check_database(pool).await,
            _ => None,
        };
        let cache = match (&self.redis, wants_cache) {
            (Some(redis), true) => {
                check_cache(redis, Duration::from_secs(self.config.connect_timeout_secs)).await
            }
            _ => None,
        };
        (db, cache)
    }

    /// Check every service concurrently and fold the results into the
    /// monitor's state. Returns the number of services checked.
    #[instrument(skip(self))]
    pub async fn check_all(&mut self) -> usize {
        // Database and cache are shared by all services, so probe them once per cycle
        let (db, cache) = self.shared_backends().await;

        let handles: Vec<_> = self
            .config
            .services
            .iter()
            .cloned()
            .map(|target| {
                let prober = self.prober.clone();
                let db = db.clone().filter(|_| target.check_database);
                let cache = cache.clone().filter(|_| target.check_cache);
                tokio::spawn(async move { check_service(&prober, &target, db, cache).await })
            })
            .collect();

        let results = join_all(handles).await;
        self.record_results(results, Utc::now());
        self.config.services.len()
    }

    /// Fold per-service task results, in service order, into the monitor's
    /// state. A task that panicked or was cancelled counts as Critical.
    fn record_results(
        &mut self,
        results: Vec<std::result::Result<ServiceHealth, JoinError>>,
        now: DateTime<Utc>,
    ) {
        let interval = self.config.interval_secs as f64;
        for (target, result) in self.config.services.iter().zip(results) {
            let health = match result {
                Ok(health) => health,
                Err(e) => {
                    error!("Failed to check {}: {}", target.name, e);
                    ServiceHealth::failed(&target.name, now)
                }
            };
            let health = carry_forward(health, self.health_data.get(&target.name), interval, now);
            self.health_data.insert(target.name.clone(), health);
        }
    }

    pub fn build_report(&self) -> HealthReport {
        let summary = summarize(self.health_data.values());
        HealthReport {
            timestamp: Utc::now(),
            monitor_uptime_seconds: self.started.elapsed().as_secs_f64(),
            services: self.health_data.clone(),
            summary,
        }
    }

    /// Persist the report and log the summary plus every critical service.
    pub fn write_report(&self, report: &HealthReport) -> Result<PathBuf> {
        let path = PathBuf::from(&self.config.report_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string_pretty(report)?)?;

        let s = &report.summary;
        info!(
            "Health Report: {} healthy, {} warning, {} critical",
            s.healthy_services, s.warning_services, s.critical_services
        );
        gauge!("gameops_services_healthy").set(s.healthy_services as f64);
        gauge!("gameops_services_warning").set(s.warning_services as f64);
        gauge!("gameops_services_critical").set(s.critical_services as f64);

        for (name, health) in &report.services {
            if health.overall_status == HealthStatus::Critical {
                let reason = health
                    .api_checks
                    .first()
                    .and_then(|c| c.error_message.as_deref())
                    .unwrap_or("Unknown error");
                warn!("CRITICAL: {} - {}", name, reason);
            }
        }
        Ok(path)
    }

    /// Single pass: check, report, return the report.
    pub async fn run_once(&mut self) -> Result<HealthReport> {
        info!("Running single health check...");
        self.check_all().await;
        let report = self.build_report();
        self.write_report(&report)?;
        Ok(report)
    }

    /// Poll forever (until Ctrl-C), keeping a fixed cadence between cycle starts.
    pub async fn run_loop(&mut self, interval: Duration) -> Result<()> {
        info!(
            "Monitoring {} services with {}s intervals",
            self.config.services.len(),
            interval.as_secs()
        );
        loop {
            let started = Instant::now();
            if let Err(e) = self.run_once().await {
                error!("Health cycle failed: {}", e);
            }
            let sleep_for = interval.saturating_sub(started.elapsed());
            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown requested, stopping health monitor");
                    return Ok(());
                }
            }
        }
    }
}
