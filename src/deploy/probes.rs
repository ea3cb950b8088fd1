use super::metrics::{ApplicationMetrics, Baseline, DatabaseMetrics, IndexStats};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Source of database metrics for the deployment monitor
#[async_trait]
pub trait DatabaseProbe: Send + Sync {
    async fn baseline(&self) -> Result<Baseline>;

    /// Never fails: an unreachable database is reported through the metrics
    async fn collect(&self) -> DatabaseMetrics;
}

/// Source of application metrics for the deployment monitor
#[async_trait]
pub trait ApplicationProbe: Send + Sync {
    async fn collect(&self) -> ApplicationMetrics;
}

/// Active client sessions. Used for both the baseline and every cycle.
const ACTIVE_CONNECTIONS_SQL: &str = "SELECT count(*) AS active_connections FROM pg_stat_activity \
     WHERE state = 'active' AND backend_type = 'client backend'";

pub struct PgDatabaseProbe {
    pool: PgPool,
    schema: String,
    table: String,
}

impl PgDatabaseProbe {
    pub fn new(pool: PgPool, schema: &str, table: &str) -> Self {
        Self {
            pool,
            schema: schema.to_string(),
            table: table.to_string(),
        }
    }

    async fn try_collect(&self) -> Result<DatabaseMetrics> {
        let mut metrics = DatabaseMetrics::default();

        let row = sqlx::query("SELECT 1::int4 AS health_check")
            .fetch_one(&self.pool)
            .await?;
        metrics.connectivity = row.try_get::<i32, _>("health_check")? == 1;

        let row = sqlx::query(ACTIVE_CONNECTIONS_SQL)
            .fetch_one(&self.pool)
            .await?;
        metrics.active_connections = row.try_get("active_connections")?;

        let table_row = sqlx::query(
            "SELECT n_live_tup, n_dead_tup, \
                    pg_size_pretty(pg_total_relation_size(relid)) AS size, \
                    pg_total_relation_size(relid) AS size_bytes \
             FROM pg_stat_user_tables WHERE schemaname = $1 AND relname = $2",
        )
        .bind(&self.schema)
        .bind(&self.table)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(row) = table_row {
            metrics.watched_table_exists = true;
            metrics.live_tuples = row.try_get("n_live_tup")?;
            metrics.dead_tuples = row.try_get("n_dead_tup")?;
            metrics.table_size = row.try_get("size")?;
            metrics.table_size_bytes = row.try_get("size_bytes")?;
        }

        // pg_stat_statements is an optional extension
        let slow = sqlx::query(
            "SELECT count(*) AS slow_queries FROM pg_stat_statements \
             WHERE mean_exec_time > 100 AND query LIKE $1",
        )
        .bind(format!("%{}%", self.table))
        .fetch_one(&self.pool)
        .await;
        metrics.slow_queries = match slow {
            Ok(row) => row.try_get("slow_queries")?,
            Err(e) => {
                debug!("pg_stat_statements unavailable: {}", e);
                0
            }
        };

        let index_rows = sqlx::query(
            "SELECT indexrelname::text AS indexname, idx_scan, idx_tup_read, idx_tup_fetch \
             FROM pg_stat_user_indexes WHERE schemaname = $1 AND relname = $2",
        )
        .bind(&self.schema)
        .bind(&self.table)
        .fetch_all(&self.pool)
        .await?;
        for row in index_rows {
            let name: String = row.try_get("indexname")?;
            metrics.index_stats.insert(
                name,
                IndexStats {
                    scans: row.try_get::<Option<i64>, _>("idx_scan")?.unwrap_or(0),
                    tuples_read: row.try_get::<Option<i64>, _>("idx_tup_read")?.unwrap_or(0),
                    tuples_fetched: row.try_get::<Option<i64>, _>("idx_tup_fetch")?.unwrap_or(0),
                },
            );
        }

        Ok(metrics)
    }
}

#[async_trait]
impl DatabaseProbe for PgDatabaseProbe {
    async fn baseline(&self) -> Result<Baseline> {
        let mut baseline = Baseline::default();
        let rows = sqlx::query(
            "SELECT relname::text AS tablename, n_live_tup, n_dead_tup \
             FROM pg_stat_user_tables WHERE schemaname = $1",
        )
        .bind(&self.schema)
        .fetch_all(&self.pool)
        .await?;
        for row in rows {
            let table: String = row.try_get("tablename")?;
            let live: Option<i64> = row.try_get("n_live_tup")?;
            let dead: Option<i64> = row.try_get("n_dead_tup")?;
            baseline.live_tuples.insert(table.clone(), live.unwrap_or(0));
            baseline.dead_tuples.insert(table, dead.unwrap_or(0));
        }

        let row = sqlx::query(ACTIVE_CONNECTIONS_SQL)
            .fetch_one(&self.pool)
            .await?;
        baseline.active_connections = row.try_get("active_connections")?;
        Ok(baseline)
    }

    async fn collect(&self) -> DatabaseMetrics {
        match self.try_collect().await {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!("Database health check failed: {}", e);
                DatabaseMetrics::unreachable(e.to_string())
            }
        }
    }
}

pub struct HttpApplicationProbe {
    client: reqwest::Client,
    health_url: String,
    api_url: String,
}

impl HttpApplicationProbe {
    pub fn new(health_url: &str, api_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            health_url: health_url.to_string(),
            api_url: api_url.to_string(),
        }
    }
}

#[async_trait]
impl ApplicationProbe for HttpApplicationProbe {
    async fn collect(&self) -> ApplicationMetrics {
        let mut metrics = ApplicationMetrics::default();

        let started = Instant::now();
        match self
            .client
            .get(&self.health_url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => {
                metrics.service_health = resp.status().as_u16() == 200;
                metrics.service_response_time_secs = Some(started.elapsed().as_secs_f64());
            }
            Err(e) => warn!("Service health check failed: {}", e),
        }

        let started = Instant::now();
        match self
            .client
            .get(&self.api_url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
        {
            Ok(resp) => {
                metrics.api_available = resp.status().as_u16() == 200;
                let body = resp.json::<serde_json::Value>().await;
                metrics.api_response_time_secs = Some(started.elapsed().as_secs_f64());
                metrics.api_returns_data = metrics.api_available && body.is_ok();
            }
            Err(e) => warn!("API check failed: {}", e),
        }

        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_connections_count_client_backends_only() {
        assert!(ACTIVE_CONNECTIONS_SQL.contains("state = 'active'"));
        assert!(ACTIVE_CONNECTIONS_SQL.contains("backend_type = 'client backend'"));
    }
}
