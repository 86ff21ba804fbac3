//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_decisions_total` (counter): decisions by route and outcome
//! - `dispatch_duration_seconds` (histogram): time spent selecting a route
//! - `route_table_reloads_total` (counter): reload attempts by result
//! - `route_table_routes` (gauge): routes in the live table
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels are bounded by configured route names

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one dispatch decision. `route` is `None` for no-match.
pub fn record_dispatch(route: Option<&str>, start: Instant) {
    let (route, outcome) = match route {
        Some(name) => (name.to_string(), "matched"),
        None => ("none".to_string(), "no_match"),
    };
    metrics::counter!("dispatch_decisions_total", "route" => route, "outcome" => outcome).increment(1);
    metrics::histogram!("dispatch_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record a route table publication.
pub fn record_reload(routes: usize, rejected: usize) {
    let result = if rejected == 0 { "ok" } else { "partial" };
    metrics::counter!("route_table_reloads_total", "result" => result).increment(1);
    metrics::gauge!("route_table_routes").set(routes as f64);
}

/// Record a config change that failed to load or validate.
pub fn record_reload_failure() {
    metrics::counter!("route_table_reloads_total", "result" => "invalid").increment(1);
}
