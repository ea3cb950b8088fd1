use std::net::SocketAddr;
use tracing::{info, warn};

/// Install the process-wide Prometheus exporter on `0.0.0.0:<port>`.
///
/// Failing to bind is not fatal: health checks keep running without a
/// scrape endpoint.
pub fn init_metrics(port: u16) {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => info!("Prometheus exporter listening on http://{}/metrics", addr),
        Err(e) => warn!("Prometheus exporter install failed (possibly already installed): {}", e),
    }
}
