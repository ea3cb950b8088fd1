//! Pure status classification rules shared by the health checks.

use super::types::{HealthStatus, HealthSummary, ServiceHealth};
use crate::constants;

/// Response-time thresholds for a 200 response
#[derive(Debug, Clone, Copy)]
pub struct ResponseThresholds {
    pub healthy_ms: f64,
    pub warning_ms: f64,
}

impl Default for ResponseThresholds {
    fn default() -> Self {
        Self {
            healthy_ms: constants::RESPONSE_HEALTHY_MS,
            warning_ms: constants::RESPONSE_WARNING_MS,
        }
    }
}

/// Classify one HTTP response by status code and latency.
pub fn classify_response(
    status_code: u16,
    elapsed_ms: f64,
    thresholds: ResponseThresholds,
) -> (HealthStatus, Option<String>) {
    match status_code {
        200 if elapsed_ms < thresholds.healthy_ms => (HealthStatus::Healthy, None),
        200 if elapsed_ms < thresholds.warning_ms => (
            HealthStatus::Warning,
            Some(format!("Slow response: {elapsed_ms:.1}ms")),
        ),
        200 => (
            HealthStatus::Critical,
            Some(format!("Very slow response: {elapsed_ms:.1}ms")),
        ),
        401 | 403 => (
            HealthStatus::Warning,
            Some(format!("Authentication issue: {status_code}")),
        ),
        code if code >= 500 => (
            HealthStatus::Critical,
            Some(format!("Server error: {status_code}")),
        ),
        _ => (
            HealthStatus::Warning,
            Some(format!("Unexpected status: {status_code}")),
        ),
    }
}

pub fn classify_database(avg_query_ms: f64) -> HealthStatus {
    if avg_query_ms > constants::DB_QUERY_CRITICAL_MS {
        HealthStatus::Critical
    } else if avg_query_ms > constants::DB_QUERY_WARNING_MS {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    }
}

/// Memory rules first, then hit-rate rules; a later matching rule wins.
pub fn classify_cache(memory_used_mb: f64, hit_rate_percent: f64) -> HealthStatus {
    let mut status = HealthStatus::Healthy;
    if memory_used_mb > constants::CACHE_MEMORY_WARNING_MB {
        status = HealthStatus::Warning;
    }
    if memory_used_mb > constants::CACHE_MEMORY_CRITICAL_MB {
        status = HealthStatus::Critical;
    }
    if hit_rate_percent < constants::CACHE_HIT_RATE_WARNING {
        status = HealthStatus::Warning;
    }
    if hit_rate_percent < constants::CACHE_HIT_RATE_CRITICAL {
        status = HealthStatus::Critical;
    }
    status
}

pub fn overall_status(service: &ServiceHealth) -> HealthStatus {
    if service
        .api_checks
        .iter()
        .any(|c| c.status == HealthStatus::Critical)
    {
        return HealthStatus::Critical;
    }

    let db_degraded = service
        .database_health
        .as_ref()
        .is_some_and(|db| db.status != HealthStatus::Healthy);
    let cache_degraded = service
        .cache_health
        .as_ref()
        .is_some_and(|c| c.status != HealthStatus::Healthy);
    if db_degraded || cache_degraded {
        return HealthStatus::Warning;
    }

    if service
        .api_checks
        .iter()
        .any(|c| c.status == HealthStatus::Warning)
    {
        return HealthStatus::Warning;
    }

    if !service.api_checks.is_empty()
        && service
            .api_checks
            .iter()
            .all(|c| c.status == HealthStatus::Healthy)
    {
        return HealthStatus::Healthy;
    }

    HealthStatus::Unknown
}

pub fn summarize<'a, I>(services: I) -> HealthSummary
where
    I: IntoIterator<Item = &'a ServiceHealth>,
{
    let mut total = 0;
    let mut healthy = 0;
    let mut warning = 0;
    let mut critical = 0;
    for s in services {
        total += 1;
        match s.overall_status {
            HealthStatus::Healthy => healthy += 1,
            HealthStatus::Warning => warning += 1,
            HealthStatus::Critical => critical += 1,
            HealthStatus::Unknown => {}
        }
    }

    let overall_status = if critical > 0 {
        HealthStatus::Critical
    } else if warning > 0 {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    };

    let health_percentage = if total > 0 {
        healthy as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    HealthSummary {
        total_services: total,
        healthy_services: healthy,
        warning_services: warning,
        critical_services: critical,
        overall_status,
        health_percentage,
    }
}
