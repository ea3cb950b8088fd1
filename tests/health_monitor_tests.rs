mod common;

use anyhow::Result;
use common::{spawn_server, Route};
use gameops::config::HealthConfig;
use gameops::health::types::ServiceKind;
use gameops::health::{HealthMonitor, HealthReport, HealthStatus, ServiceTarget};
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

fn target(name: &str, kind: ServiceKind, port: u16, health: &str, endpoints: &[&str]) -> ServiceTarget {
    let mut target = ServiceTarget::new(name, kind, port, endpoints);
    target.host = "127.0.0.1".to_string();
    target.health_endpoint = health.to_string();
    target.check_database = false;
    target.check_cache = false;
    target
}

async fn closed_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn single_cycle_classifies_services_and_writes_report() -> Result<()> {
    let server = spawn_server(vec![
        Route::ok("/auth/health", r#"{"status":"ok","sessions":12}"#),
        Route::ok("/auth/sessions/stats", "{}"),
        Route::status("/combat/health", 503),
        Route::status("/economy/health", 401),
    ])
    .await;
    let port = server.addr.port();
    let dead_port = closed_port().await;

    let dir = tempdir()?;
    let report_path = dir.path().join("reports/health_report.json");
    let config = HealthConfig {
        report_path: report_path.display().to_string(),
        warning_response_ms: 5_000.0,
        healthy_response_ms: 2_000.0,
        services: vec![
            target("auth-service", ServiceKind::Auth, port, "/auth/health", &["/auth/sessions/stats"]),
            target("combat-service", ServiceKind::Combat, port, "/combat/health", &["/combat/health/ws"]),
            target("economy-service", ServiceKind::Economy, port, "/economy/health", &[]),
            target("matchmaking-service", ServiceKind::Matchmaking, dead_port, "/health", &[]),
        ],
        ..HealthConfig::default()
    };

    let mut monitor = HealthMonitor::new(config)?;
    let report = monitor.run_once().await?;

    let auth = &report.services["auth-service"];
    assert_eq!(auth.overall_status, HealthStatus::Healthy);
    assert_eq!(auth.api_checks.len(), 2);
    assert_eq!(auth.api_checks[0].metrics.as_ref().unwrap()["sessions"], 12);

    // a critical health endpoint short-circuits the remaining endpoints
    let combat = &report.services["combat-service"];
    assert_eq!(combat.overall_status, HealthStatus::Critical);
    assert_eq!(combat.api_checks.len(), 1);
    assert_eq!(combat.api_checks[0].error_message.as_deref(), Some("Server error: 503"));

    let economy = &report.services["economy-service"];
    assert_eq!(economy.overall_status, HealthStatus::Warning);
    assert_eq!(
        economy.api_checks[0].error_message.as_deref(),
        Some("Authentication issue: 401")
    );

    let matchmaking = &report.services["matchmaking-service"];
    assert_eq!(matchmaking.overall_status, HealthStatus::Critical);
    assert!(matchmaking.api_checks[0]
        .error_message
        .as_deref()
        .unwrap()
        .starts_with("Connection error"));

    assert_eq!(report.summary.total_services, 4);
    assert_eq!(report.summary.healthy_services, 1);
    assert_eq!(report.summary.warning_services, 1);
    assert_eq!(report.summary.critical_services, 2);
    assert_eq!(report.summary.overall_status, HealthStatus::Critical);
    assert_eq!(report.summary.health_percentage, 25.0);

    let written: HealthReport = serde_json::from_str(&fs::read_to_string(&report_path)?)?;
    assert_eq!(written.services.len(), 4);
    assert_eq!(written.summary, report.summary);
    Ok(())
}

#[tokio::test]
async fn uptime_and_incidents_carry_across_cycles() -> Result<()> {
    let server = spawn_server(vec![Route::ok("/health", "{}")]).await;
    let dir = tempdir()?;
    let config = HealthConfig {
        interval_secs: 30,
        report_path: dir.path().join("health.json").display().to_string(),
        healthy_response_ms: 2_000.0,
        warning_response_ms: 5_000.0,
        services: vec![target("auth-service", ServiceKind::Auth, server.addr.port(), "/health", &[])],
        ..HealthConfig::default()
    };

    let mut monitor = HealthMonitor::new(config)?;
    monitor.run_once().await?;
    let report = monitor.run_once().await?;

    let auth = &report.services["auth-service"];
    assert_eq!(auth.uptime_seconds, 60.0);
    assert!(auth.last_incident.is_none());
    assert_eq!(server.recorded().len(), 2);
    Ok(())
}

#[tokio::test]
async fn slow_responses_are_warnings_and_timeouts_are_critical() -> Result<()> {
    let server = spawn_server(vec![
        Route::ok("/slow/health", "{}").delayed(Duration::from_millis(150)),
        Route::ok("/hung/health", "{}").delayed(Duration::from_secs(5)),
    ])
    .await;
    let port = server.addr.port();
    let dir = tempdir()?;
    let config = HealthConfig {
        request_timeout_secs: 1,
        report_path: dir.path().join("health.json").display().to_string(),
        healthy_response_ms: 100.0,
        warning_response_ms: 900.0,
        services: vec![
            target("slow-service", ServiceKind::Other, port, "/slow/health", &[]),
            target("hung-service", ServiceKind::Other, port, "/hung/health", &[]),
        ],
        ..HealthConfig::default()
    };

    let mut monitor = HealthMonitor::new(config)?;
    let report = monitor.run_once().await?;

    let slow = &report.services["slow-service"].api_checks[0];
    assert_eq!(slow.status, HealthStatus::Warning);
    assert!(slow.error_message.as_deref().unwrap().starts_with("Slow response: "));

    let hung = &report.services["hung-service"].api_checks[0];
    assert_eq!(hung.status, HealthStatus::Critical);
    assert_eq!(hung.error_message.as_deref(), Some("Request timeout"));
    assert_eq!(hung.response_time_ms, 1_000.0);
    Ok(())
}
