use super::metrics::{ApplicationMetrics, Baseline, DatabaseMetrics};
use crate::constants;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// Slack attachment color
    pub fn color(&self) -> &'static str {
        match self {
            Severity::Critical => "danger",
            Severity::High | Severity::Medium => "warning",
            Severity::Low => "good",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub name: String,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub escalation_count: u32,
    pub last_escalated: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn new(name: impl Into<String>, severity: Severity, message: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            severity,
            message: message.into(),
            timestamp: now,
            resolved: false,
            resolved_at: None,
            escalation_count: 0,
            last_escalated: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlertRules {
    pub table: String,
    pub connection_spike_factor: i64,
    pub slow_query_threshold: i64,
    pub api_slow_secs: f64,
}

impl AlertRules {
    pub fn for_table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            connection_spike_factor: constants::CONNECTION_SPIKE_FACTOR,
            slow_query_threshold: constants::SLOW_QUERY_ALERT_COUNT,
            api_slow_secs: constants::API_SLOW_SECS,
        }
    }

    /// `quest_definitions` -> `QuestDefinitionsTableMissing`
    fn missing_table_alert(&self) -> String {
        let pascal: String = self
            .table
            .split(['_', '-', '.'])
            .filter(|p| !p.is_empty())
            .map(|p| {
                let mut chars = p.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect();
        format!("{pascal}TableMissing")
    }
}

/// Evaluate one cycle of metrics against the rules. Every returned alert is
/// a condition that currently holds.
///
/// Without a baseline the connection spike rule is skipped.
pub fn analyze(
    db: &DatabaseMetrics,
    app: &ApplicationMetrics,
    baseline: Option<&Baseline>,
    rules: &AlertRules,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if !db.connectivity {
        alerts.push(Alert::new(
            "DatabaseConnectivityLost",
            Severity::Critical,
            "Lost connectivity to production database",
            now,
        ));
    }

    if !db.watched_table_exists {
        alerts.push(Alert::new(
            rules.missing_table_alert(),
            Severity::Critical,
            format!("{} table does not exist", rules.table),
            now,
        ));
    }

    if let Some(base) = baseline.map(|b| b.active_connections) {
        let current = db.active_connections;
        if current > base * rules.connection_spike_factor {
            let message = if base > 0 {
                let pct = (current as f64 / base as f64 - 1.0) * 100.0;
                format!("Database connections increased by {pct:.1}%")
            } else {
                format!("Database connections rose from 0 to {current}")
            };
            alerts.push(Alert::new("DatabaseConnectionSpike", Severity::High, message, now));
        }
    }

    if db.slow_queries > rules.slow_query_threshold {
        alerts.push(Alert::new(
            "ExcessiveSlowQueries",
            Severity::Medium,
            format!(
                "Found {} slow {}-related queries (>100ms)",
                db.slow_queries, rules.table
            ),
            now,
        ));
    }

    if !app.service_health {
        alerts.push(Alert::new(
            "ServiceUnhealthy",
            Severity::High,
            "Service health check failed",
            now,
        ));
    }

    if !app.api_available {
        alerts.push(Alert::new("ApiDown", Severity::High, "API is not responding", now));
    }

    if let Some(secs) = app.api_response_time_secs.filter(|s| *s > rules.api_slow_secs) {
        alerts.push(Alert::new(
            "ApiResponseSlow",
            Severity::Medium,
            format!(
                "API response time: {secs:.2}s (threshold: {:.1}s)",
                rules.api_slow_secs
            ),
            now,
        ));
    }

    alerts
}

/// Alert history for one monitoring session.
#[derive(Debug, Default)]
pub struct AlertBook {
    alerts: Vec<Alert>,
}

impl AlertBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the alerts raised this cycle into the book.
    ///
    /// A raised alert whose name is already active is not duplicated. Active
    /// alerts that were not raised again are resolved. Returns the newly
    /// opened alerts.
    pub fn reconcile(&mut self, raised: Vec<Alert>, now: DateTime<Utc>) -> Vec<Alert> {
        for active in self.alerts.iter_mut().filter(|a| !a.resolved) {
            if !raised.iter().any(|r| r.name == active.name) {
                active.resolved = true;
                active.resolved_at = Some(now);
            }
        }

        let mut opened = Vec::new();
        for alert in raised {
            let already_active = self
                .alerts
                .iter()
                .any(|a| !a.resolved && a.name == alert.name);
            if !already_active {
                opened.push(alert.clone());
                self.alerts.push(alert);
            }
        }
        opened
    }

    pub fn all(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn active(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter().filter(|a| !a.resolved)
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    pub fn active_mut(&mut self) -> impl Iterator<Item = &mut Alert> {
        self.alerts.iter_mut().filter(|a| !a.resolved)
    }
}

/// Decides when an active alert is (re)sent to the webhook
#[derive(Debug, Clone, Copy)]
pub struct EscalationPolicy {
    pub interval: Duration,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::seconds(constants::ALERT_ESCALATION_SECS),
        }
    }
}

impl EscalationPolicy {
    /// First notification goes out immediately. After that only once the
    /// escalation interval has passed since the last delivered one.
    pub fn is_due(&self, alert: &Alert, now: DateTime<Utc>) -> bool {
        if alert.resolved {
            return false;
        }
        match alert.last_escalated {
            None => true,
            Some(last) => now - last > self.interval,
        }
    }

    /// Record a delivered notification. Every delivery after the first one
    /// bumps the escalation count.
    pub fn mark_sent(&self, alert: &mut Alert, now: DateTime<Utc>) {
        if alert.last_escalated.is_some() {
            alert.escalation_count += 1;
        }
        alert.last_escalated = Some(now);
    }
}

/// Slack-compatible webhook body
pub fn webhook_payload(alert: &Alert, environment: &str, deployment_id: &str) -> serde_json::Value {
    let severity = alert.severity.as_str().to_uppercase();
    json!({
        "text": format!("*{}*: {}", severity, alert.name),
        "attachments": [{
            "color": alert.severity.color(),
            "fields": [
                {"title": "Environment", "value": environment, "short": true},
                {"title": "Deployment ID", "value": deployment_id, "short": true},
                {"title": "Severity", "value": severity, "short": true},
                {"title": "Escalation Count", "value": alert.escalation_count.to_string(), "short": true},
            ],
            "text": alert.message,
            "footer": "Database Migration Monitor",
            "ts": alert.timestamp.timestamp(),
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn healthy_db() -> DatabaseMetrics {
        DatabaseMetrics {
            connectivity: true,
            active_connections: 4,
            watched_table_exists: true,
            ..DatabaseMetrics::default()
        }
    }

    fn healthy_app() -> ApplicationMetrics {
        ApplicationMetrics {
            service_health: true,
            service_response_time_secs: Some(0.01),
            api_available: true,
            api_response_time_secs: Some(0.2),
            api_returns_data: true,
        }
    }

    fn baseline(conns: i64) -> Baseline {
        Baseline {
            active_connections: conns,
            ..Baseline::default()
        }
    }

    fn names(alerts: &[Alert]) -> Vec<&str> {
        alerts.iter().map(|a| a.name.as_str()).collect()
    }

    #[test]
    fn healthy_cycle_raises_nothing() {
        let rules = AlertRules::for_table("quest_definitions");
        let alerts = analyze(&healthy_db(), &healthy_app(), Some(&baseline(3)), &rules, Utc::now());
        assert!(alerts.is_empty(), "unexpected alerts: {:?}", names(&alerts));
    }

    #[test]
    fn unreachable_database_raises_connectivity_and_missing_table() {
        let rules = AlertRules::for_table("quest_definitions");
        let db = DatabaseMetrics::unreachable("connection refused");
        let alerts = analyze(&db, &healthy_app(), Some(&baseline(0)), &rules, Utc::now());
        assert_eq!(
            names(&alerts),
            vec!["DatabaseConnectivityLost", "QuestDefinitionsTableMissing"]
        );
        assert!(alerts.iter().all(|a| a.severity == Severity::Critical));
    }

    #[test]
    fn connection_spike_reports_percentage() {
        let rules = AlertRules::for_table("quest_definitions");
        let mut db = healthy_db();
        db.active_connections = 25;
        let alerts = analyze(&db, &healthy_app(), Some(&baseline(10)), &rules, Utc::now());
        assert_eq!(names(&alerts), vec!["DatabaseConnectionSpike"]);
        assert_eq!(alerts[0].message, "Database connections increased by 150.0%");

        // exactly double is not a spike
        db.active_connections = 20;
        assert!(analyze(&db, &healthy_app(), Some(&baseline(10)), &rules, Utc::now()).is_empty());
    }

    #[test]
    fn no_spike_without_baseline() {
        let rules = AlertRules::for_table("quest_definitions");
        let mut db = healthy_db();
        db.active_connections = 1;
        assert!(analyze(&db, &healthy_app(), None, &rules, Utc::now()).is_empty());

        db.active_connections = 500;
        assert!(analyze(&db, &healthy_app(), None, &rules, Utc::now()).is_empty());
    }

    #[test]
    fn slow_api_and_slow_queries() {
        let rules = AlertRules::for_table("quest_definitions");
        let mut db = healthy_db();
        db.slow_queries = 11;
        let mut app = healthy_app();
        app.api_response_time_secs = Some(2.5);
        app.service_health = false;

        let alerts = analyze(&db, &app, Some(&baseline(4)), &rules, Utc::now());
        assert_eq!(
            names(&alerts),
            vec!["ExcessiveSlowQueries", "ServiceUnhealthy", "ApiResponseSlow"]
        );
        assert_eq!(alerts[2].message, "API response time: 2.50s (threshold: 2.0s)");
    }

    #[test]
    fn reconcile_dedupes_and_resolves() {
        let t0 = Utc::now();
        let mut book = AlertBook::new();
        let opened = book.reconcile(
            vec![
                Alert::new("ApiDown", Severity::High, "down", t0),
                Alert::new("ServiceUnhealthy", Severity::High, "bad", t0),
            ],
            t0,
        );
        assert_eq!(opened.len(), 2);

        let t1 = t0 + Duration::seconds(60);
        let opened = book.reconcile(vec![Alert::new("ApiDown", Severity::High, "down", t1)], t1);
        assert!(opened.is_empty());
        assert_eq!(book.active_count(), 1);

        let resolved = book.all().iter().find(|a| a.name == "ServiceUnhealthy").unwrap();
        assert!(resolved.resolved);
        assert_eq!(resolved.resolved_at, Some(t1));

        // a resolved condition that comes back opens a fresh alert
        let t2 = t1 + Duration::seconds(60);
        let opened = book.reconcile(
            vec![
                Alert::new("ApiDown", Severity::High, "down", t2),
                Alert::new("ServiceUnhealthy", Severity::High, "bad", t2),
            ],
            t2,
        );
        assert_eq!(names(&opened), vec!["ServiceUnhealthy"]);
        assert_eq!(book.all().len(), 3);
    }

    #[test]
    fn escalation_waits_for_interval() {
        let policy = EscalationPolicy::default();
        let t0 = Utc::now();
        let mut alert = Alert::new("ApiDown", Severity::High, "down", t0);

        assert!(policy.is_due(&alert, t0));
        policy.mark_sent(&mut alert, t0);
        assert_eq!(alert.escalation_count, 0);
        assert!(!policy.is_due(&alert, t0 + Duration::seconds(120)));
        assert!(!policy.is_due(&alert, t0 + Duration::seconds(300)));
        let t1 = t0 + Duration::seconds(301);
        assert!(policy.is_due(&alert, t1));
        policy.mark_sent(&mut alert, t1);
        assert_eq!(alert.escalation_count, 1);
        assert_eq!(alert.last_escalated, Some(t1));

        alert.resolved = true;
        assert!(!policy.is_due(&alert, t0 + Duration::seconds(1000)));
    }

    #[test]
    fn checking_due_does_not_stamp() {
        let policy = EscalationPolicy::default();
        let t0 = Utc::now();
        let alert = Alert::new("ApiDown", Severity::High, "down", t0);

        assert!(policy.is_due(&alert, t0));
        assert!(policy.is_due(&alert, t0 + Duration::seconds(5)));
        assert_eq!(alert.last_escalated, None);
        assert_eq!(alert.escalation_count, 0);
    }

    #[test]
    fn payload_carries_deployment_context() {
        let alert = Alert::new("ApiDown", Severity::Critical, "API is not responding", Utc::now());
        let payload = webhook_payload(&alert, "production", "deploy-42");
        assert_eq!(payload["text"], "*CRITICAL*: ApiDown");
        let attachment = &payload["attachments"][0];
        assert_eq!(attachment["color"], "danger");
        assert_eq!(attachment["fields"][1]["value"], "deploy-42");
        assert_eq!(attachment["text"], "API is not responding");
    }
}
