use super::status::classify_database;
use super::types::{DatabaseHealth, SlowQuery};
use crate::constants;
use crate::error::Result;
use sqlx::{PgPool, Row};
use tracing::error;

const CONNECTION_STATS_SQL: &str = r#"
SELECT
    count(*) AS total_connections,
    count(*) FILTER (WHERE state = 'active') AS active_connections,
    count(*) FILTER (WHERE state = 'idle') AS idle_connections,
    (avg(extract(epoch FROM (now() - query_start))) * 1000)::float8 AS avg_query_time
FROM pg_stat_activity
WHERE datname = current_database()
"#;

const SLOW_QUERIES_SQL: &str = r#"
SELECT
    query,
    (extract(epoch FROM (now() - query_start)) * 1000)::float8 AS duration_ms,
    usename::text AS usename,
    client_addr::text AS client_addr
FROM pg_stat_activity
WHERE datname = current_database()
  AND query_start IS NOT NULL
  AND extract(epoch FROM (now() - query_start)) > 0.1
ORDER BY query_start DESC
LIMIT $1
"#;

async fn query_database_health(pool: &PgPool) -> Result<DatabaseHealth> {
    let stats = sqlx::query(CONNECTION_STATS_SQL).fetch_one(pool).await?;
    let total: i64 = stats.try_get("total_connections")?;
    let active: i64 = stats.try_get("active_connections")?;
    let idle: i64 = stats.try_get("idle_connections")?;
    let avg: Option<f64> = stats.try_get("avg_query_time")?;
    let avg = avg.unwrap_or(0.0);

    let rows = sqlx::query(SLOW_QUERIES_SQL)
        .bind(constants::SLOW_QUERY_LIMIT)
        .fetch_all(pool)
        .await?;
    let mut slowest = Vec::with_capacity(rows.len());
    for row in rows {
        let query: Option<String> = row.try_get("query")?;
        let duration_ms: Option<f64> = row.try_get("duration_ms")?;
        slowest.push(SlowQuery {
            query: query.unwrap_or_default(),
            duration_ms: duration_ms.unwrap_or(0.0),
            username: row.try_get("usename")?,
            client_addr: row.try_get("client_addr")?,
        });
    }

    Ok(DatabaseHealth {
        connections_active: active,
        connections_idle: idle,
        connections_total: total,
        query_avg_time_ms: avg,
        slowest_queries: slowest,
        status: classify_database(avg),
    })
}

/// Connection and query-latency snapshot from `pg_stat_activity`.
/// Failures are logged and reported as "no data".
pub async fn check_database(pool: &PgPool) -> Option<DatabaseHealth> {
    match query_database_health(pool).await {
        Ok(health) => Some(health),
        Err(e) => {
            error!("Database health check failed: {}", e);
            None
        }
    }
}
