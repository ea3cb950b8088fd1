use super::alerts::Alert;
use super::metrics::DatabaseMetrics;
use crate::error::{OpsError, Result};
use ::metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use tracing::info;

/// Monitor-local Prometheus registry pushed to a Pushgateway.
///
/// The recorder is private to the monitor so its series never mix with the
/// process-wide exporter.
pub struct MetricsPusher {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    client: reqwest::Client,
    gateway_url: String,
    job: String,
}

impl MetricsPusher {
    pub fn new(gateway_url: &str, environment: &str) -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        Self {
            recorder,
            handle,
            client: reqwest::Client::new(),
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
            job: format!("database_migration_monitor_{environment}"),
        }
    }

    pub fn push_url(&self) -> String {
        format!("{}/metrics/job/{}", self.gateway_url, self.job)
    }

    pub fn record(&self, db: &DatabaseMetrics, table: &str, new_alerts: &[Alert]) {
        ::metrics::with_local_recorder(&self.recorder, || {
            gauge!("database_connections_active").set(db.active_connections as f64);
            gauge!("database_table_size_bytes", "table" => table.to_string())
                .set(db.table_size_bytes.unwrap_or(0) as f64);
            for alert in new_alerts {
                counter!("migration_alerts_total", "severity" => alert.severity.as_str())
                    .increment(1);
            }
        });
    }

    /// Prometheus text exposition of everything recorded so far
    pub fn render(&self) -> String {
        self.handle.render()
    }

    pub async fn push(&self) -> Result<()> {
        let url = self.push_url();
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "text/plain; version=0.0.4")
            .body(self.render())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(OpsError::Pushgateway { status, body });
        }
        info!("Pushed metrics to Pushgateway job={}", self.job);
        Ok(())
    }
}
