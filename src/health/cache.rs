//! Redis health via `INFO memory`, `INFO stats` and `INFO clients`.

use super::status::classify_cache;
use super::types::CacheHealth;
use crate::config::RedisConfig;
use crate::error::Result;
use redis::aio::MultiplexedConnection;
use std::collections::HashMap;
use std::time::Duration;
use tracing::error;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Parse the `key:value` body of an `INFO` reply. Section headers and blank
/// lines are skipped.
pub fn parse_info(text: &str) -> HashMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn number(info: &HashMap<String, String>, key: &str) -> f64 {
    info.get(key).and_then(|v| v.parse().ok()).unwrap_or(0.0)
}

pub fn cache_health_from_info(
    memory: &HashMap<String, String>,
    stats: &HashMap<String, String>,
    clients: &HashMap<String, String>,
) -> CacheHealth {
    let memory_used_mb = number(memory, "used_memory") / BYTES_PER_MB;
    let memory_peak_mb = number(memory, "used_memory_peak") / BYTES_PER_MB;
    let connections_active = number(clients, "connected_clients") as i64;

    let hits = number(stats, "keyspace_hits");
    let misses = number(stats, "keyspace_misses");
    let total = hits + misses;
    let hit_rate_percent = if total > 0.0 { hits / total * 100.0 } else { 100.0 };

    let evicted = number(stats, "evicted_keys");
    let received = number(stats, "total_connections_received").max(1.0);
    let eviction_rate = evicted / received;

    CacheHealth {
        memory_used_mb,
        memory_peak_mb,
        connections_active,
        hit_rate_percent,
        eviction_rate,
        status: classify_cache(memory_used_mb, hit_rate_percent),
    }
}

async fn info(
    connection: &mut MultiplexedConnection,
    section: &str,
) -> Result<HashMap<String, String>> {
    let text: String = redis::cmd("INFO").arg(section).query_async(connection).await?;
    Ok(parse_info(&text))
}

async fn query_cache_health(config: &RedisConfig) -> Result<CacheHealth> {
    let client = redis::Client::open(config.connection_info())?;
    let mut connection = client.get_multiplexed_async_connection().await?;
    let memory = info(&mut connection, "memory").await?;
    let stats = info(&mut connection, "stats").await?;
    let clients = info(&mut connection, "clients").await?;
    Ok(cache_health_from_info(&memory, &stats, &clients))
}

/// Failures are logged and reported as "no data".
pub async fn check_cache(config: &RedisConfig, timeout: Duration) -> Option<CacheHealth> {
    match tokio::time::timeout(timeout, query_cache_health(config)).await {
        Ok(Ok(health)) => Some(health),
        Ok(Err(e)) => {
            error!("Cache health check failed: {}", e);
            None
        }
        Err(_) => {
            error!("Cache health check timed out");
            None
        }
    }
}
