use super::status::{classify_response, ResponseThresholds};
use super::types::{EndpointCheck, HealthStatus, ServiceTarget};
use crate::error::Result;
use chrono::Utc;
use metrics::{counter, histogram};
use std::time::{Duration, Instant};
use tracing::debug;

/// HTTP prober for service endpoints. Cheap to clone; the inner client is shared.
#[derive(Debug, Clone)]
pub struct EndpointProber {
    client: reqwest::Client,
    request_timeout: Duration,
    thresholds: ResponseThresholds,
}

impl EndpointProber {
    pub fn new(
        request_timeout: Duration,
        connect_timeout: Duration,
        thresholds: ResponseThresholds,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self {
            client,
            request_timeout,
            thresholds,
        })
    }

    /// Probe a single URL. Never fails: transport errors become Critical checks.
    pub async fn check_endpoint(&self, target: &ServiceTarget, url: &str) -> EndpointCheck {
        let mut check = EndpointCheck {
            service_name: target.name.clone(),
            service_kind: target.kind,
            endpoint: url.to_string(),
            status: HealthStatus::Unknown,
            response_time_ms: 0.0,
            last_check: Utc::now(),
            error_message: None,
            metrics: None,
        };

        let started = Instant::now();
        match self.client.get(url).send().await {
            Ok(response) => {
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                let code = response.status().as_u16();
                check.response_time_ms = elapsed_ms;
                if code == 200 {
                    // Body is optional extra context; a non-JSON body is fine
                    check.metrics = response.json::<serde_json::Value>().await.ok();
                }
                let (status, message) = classify_response(code, elapsed_ms, self.thresholds);
                check.status = status;
                check.error_message = message;
            }
            Err(e) if e.is_timeout() => {
                check.status = HealthStatus::Critical;
                check.error_message = Some("Request timeout".to_string());
                check.response_time_ms = self.request_timeout.as_secs_f64() * 1000.0;
            }
            Err(e) => {
                check.status = HealthStatus::Critical;
                check.error_message = Some(format!("Connection error: {e}"));
            }
        }

        debug!(
            service = %target.name,
            endpoint = %url,
            status = %check.status,
            "endpoint checked in {:.1}ms",
            check.response_time_ms
        );
        histogram!("gameops_health_response_ms", "service" => target.name.clone())
            .record(check.response_time_ms);
        counter!(
            "gameops_health_checks_total",
            "service" => target.name.clone(),
            "status" => check.status.as_str()
        )
        .increment(1);

        check
    }

    /// Health endpoint first; the remaining endpoints only when it is reachable
    /// and not critical.
    pub async fn check_api_endpoints(&self, target: &ServiceTarget) -> Vec<EndpointCheck> {
        let base_url = target.base_url();
        let health = self
            .check_endpoint(target, &format!("{}{}", base_url, target.health_endpoint))
            .await;
        let proceed = matches!(health.status, HealthStatus::Healthy | HealthStatus::Warning);

        let mut checks = vec![health];
        if proceed {
            for endpoint in &target.endpoints {
                let check = self
                    .check_endpoint(target, &format!("{base_url}{endpoint}"))
                    .await;
                checks.push(check);
            }
        }
        checks
    }
}
