use super::alerts::{analyze, webhook_payload, Alert, AlertBook, AlertRules, EscalationPolicy};
use super::metrics::{ApplicationMetrics, Baseline, DatabaseMetrics};
use super::probes::{ApplicationProbe, DatabaseProbe};
use super::push::MetricsPusher;
use crate::constants;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct DeployMonitorConfig {
    pub environment: String,
    pub deployment_id: String,
    pub schema: String,
    pub table: String,
    pub pushgateway_url: Option<String>,
    pub alert_webhook: Option<String>,
    pub duration: Duration,
    pub interval: Duration,
    pub escalation_interval: chrono::Duration,
    pub snapshot_dir: PathBuf,
}

impl DeployMonitorConfig {
    pub fn new(environment: &str, deployment_id: &str) -> Self {
        Self {
            environment: environment.to_string(),
            deployment_id: deployment_id.to_string(),
            schema: constants::DEFAULT_WATCHED_SCHEMA.to_string(),
            table: constants::DEFAULT_WATCHED_TABLE.to_string(),
            pushgateway_url: None,
            alert_webhook: None,
            duration: Duration::from_secs(constants::DEPLOY_DURATION_SECS),
            interval: Duration::from_secs(constants::DEPLOY_INTERVAL_SECS),
            escalation_interval: chrono::Duration::seconds(constants::ALERT_ESCALATION_SECS),
            snapshot_dir: PathBuf::from("logs"),
        }
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.snapshot_dir
            .join(format!("migration-monitor-{}.jsonl", self.deployment_id))
    }
}

#[derive(Debug, Serialize)]
struct Snapshot<'a> {
    timestamp: DateTime<Utc>,
    environment: &'a str,
    deployment_id: &'a str,
    database_metrics: &'a DatabaseMetrics,
    application_metrics: &'a ApplicationMetrics,
    active_alerts: usize,
}

/// What one monitoring cycle observed and did
#[derive(Debug)]
pub struct CycleOutcome {
    pub database: DatabaseMetrics,
    pub application: ApplicationMetrics,
    pub new_alerts: Vec<Alert>,
    pub notifications_sent: usize,
    pub active_alerts: usize,
}

pub struct DeploymentMonitor {
    config: DeployMonitorConfig,
    database: Arc<dyn DatabaseProbe>,
    application: Arc<dyn ApplicationProbe>,
    baseline: Option<Baseline>,
    alerts: AlertBook,
    rules: AlertRules,
    escalation: EscalationPolicy,
    pusher: Option<MetricsPusher>,
    client: reqwest::Client,
}

impl DeploymentMonitor {
    pub fn new(
        config: DeployMonitorConfig,
        database: Arc<dyn DatabaseProbe>,
        application: Arc<dyn ApplicationProbe>,
    ) -> Self {
        let pusher = config
            .pushgateway_url
            .as_deref()
            .map(|url| MetricsPusher::new(url, &config.environment));
        Self {
            rules: AlertRules::for_table(&config.table),
            escalation: EscalationPolicy {
                interval: config.escalation_interval,
            },
            config,
            database,
            application,
            baseline: None,
            alerts: AlertBook::new(),
            pusher,
            client: reqwest::Client::new(),
        }
    }

    pub fn alerts(&self) -> &AlertBook {
        &self.alerts
    }

    /// `None` until a baseline has been collected successfully
    pub fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    pub async fn collect_baseline(&mut self) {
        info!("Collecting baseline metrics...");
        match self.database.baseline().await {
            Ok(baseline) => {
                info!(
                    "Baseline: {} active connections, {} tables",
                    baseline.active_connections,
                    baseline.live_tuples.len()
                );
                self.baseline = Some(baseline);
            }
            Err(e) => error!(
                "Failed to collect baseline metrics, connection spike alerts disabled: {}",
                e
            ),
        }
    }

    /// Send every active alert that is due under the escalation policy.
    async fn notify(&mut self, now: DateTime<Utc>) -> usize {
        let Some(webhook) = self.config.alert_webhook.clone() else {
            return 0;
        };

        let due: Vec<Alert> = self
            .alerts
            .active()
            .filter(|alert| self.escalation.is_due(alert, now))
            .map(|alert| {
                let mut pending = alert.clone();
                self.escalation.mark_sent(&mut pending, now);
                pending
            })
            .collect();

        let mut sent = 0;
        for alert in &due {
            let payload =
                webhook_payload(alert, &self.config.environment, &self.config.deployment_id);
            match self
                .client
                .post(&webhook)
                .json(&payload)
                .timeout(Duration::from_secs(10))
                .send()
                .await
            {
                Ok(resp) if resp.status().as_u16() == 200 => {
                    info!("Alert sent: {}", alert.name);
                    if let Some(stored) = self.alerts.active_mut().find(|a| a.name == alert.name) {
                        stored.escalation_count = alert.escalation_count;
                        stored.last_escalated = alert.last_escalated;
                    }
                    sent += 1;
                }
                Ok(resp) => error!("Failed to send alert {}: HTTP {}", alert.name, resp.status()),
                Err(e) => error!("Failed to send alert webhook {}: {}", alert.name, e),
            }
        }
        sent
    }

    fn save_snapshot(&self, db: &DatabaseMetrics, app: &ApplicationMetrics) -> Result<()> {
        let snapshot = Snapshot {
            timestamp: Utc::now(),
            environment: &self.config.environment,
            deployment_id: &self.config.deployment_id,
            database_metrics: db,
            application_metrics: app,
            active_alerts: self.alerts.active_count(),
        };
        fs::create_dir_all(&self.config.snapshot_dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.config.snapshot_path())?;
        writeln!(file, "{}", serde_json::to_string(&snapshot)?)?;
        Ok(())
    }

    /// Collect, analyze, alert, push and snapshot once.
    #[instrument(skip(self), fields(deployment_id = %self.config.deployment_id))]
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let database = self.database.collect().await;
        let application = self.application.collect().await;

        let now = Utc::now();
        let raised = analyze(
            &database,
            &application,
            self.baseline.as_ref(),
            &self.rules,
            now,
        );
        let new_alerts = self.alerts.reconcile(raised, now);
        for alert in &new_alerts {
            warn!("{} alert raised: {} - {}", alert.severity.as_str(), alert.name, alert.message);
        }

        let notifications_sent = self.notify(now).await;

        if let Some(pusher) = &self.pusher {
            pusher.record(&database, &self.config.table, &new_alerts);
            if let Err(e) = pusher.push().await {
                warn!("Failed to update Prometheus metrics: {}", e);
            }
        }

        if let Err(e) = self.save_snapshot(&database, &application) {
            warn!("Failed to save metrics snapshot: {}", e);
        }

        let active_alerts = self.alerts.active_count();
        info!("Monitoring cycle complete. Active alerts: {}", active_alerts);

        Ok(CycleOutcome {
            database,
            application,
            new_alerts,
            notifications_sent,
            active_alerts,
        })
    }

    /// Baseline, then cycle until the configured duration has elapsed.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            "Starting post-deployment monitoring for {}s (environment={}, deployment={})",
            self.config.duration.as_secs(),
            self.config.environment,
            self.config.deployment_id
        );
        self.collect_baseline().await;

        let started = Instant::now();
        while started.elapsed() < self.config.duration {
            if let Err(e) = self.run_cycle().await {
                error!("Monitoring cycle failed: {}", e);
            }
            let remaining = self.config.duration.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(self.config.interval.min(remaining)).await;
        }

        info!("Post-deployment monitoring completed");
        Ok(())
    }
}
