//! Metrics collection and exposition.
//!
//! # Metrics
//! - `api_requests_total` (counter): requests by method, route, status
//! - `api_request_duration_seconds` (histogram): latency distribution
//! - `db_pool_acquire_total` (counter): acquisitions by outcome
//!   (`pooled`, `direct`, `failed`)
//! - `db_pool_acquire_retries_total` (counter): failed attempts that were retried
//! - `db_pool_force_closed_total` (counter): connections closed instead of pooled
//! - `db_pool_connections` (gauge): live, idle, borrowed and direct connections
//! - `db_pool_degraded` (gauge): 1 while new pooled connections are refused

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::db::PoolStatus;

/// Start the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Prometheus metrics listening on /metrics"),
        Err(e) => tracing::error!(error = %e, "Failed to start Prometheus exporter"),
    }
}

/// Record one finished HTTP request.
pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    let status = status.to_string();
    metrics::counter!(
        "api_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.clone()
    )
    .increment(1);
    metrics::histogram!(
        "api_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_pool_acquire(outcome: &'static str) {
    metrics::counter!("db_pool_acquire_total", "outcome" => outcome).increment(1);
}

pub fn record_pool_retry() {
    metrics::counter!("db_pool_acquire_retries_total").increment(1);
}

pub fn record_pool_force_closed() {
    metrics::counter!("db_pool_force_closed_total").increment(1);
}

/// Publish a pool snapshot.
pub fn set_pool_gauges(status: &PoolStatus) {
    metrics::gauge!("db_pool_connections", "state" => "live").set(status.live as f64);
    metrics::gauge!("db_pool_connections", "state" => "idle").set(status.idle as f64);
    metrics::gauge!("db_pool_connections", "state" => "borrowed").set(status.borrowed as f64);
    metrics::gauge!("db_pool_connections", "state" => "direct").set(status.direct as f64);
    metrics::gauge!("db_pool_degraded").set(if status.degraded { 1.0 } else { 0.0 });
}
