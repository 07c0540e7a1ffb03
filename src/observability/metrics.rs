//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by service, status
//! - `http_request_duration_seconds` (histogram): time to response head
//! - `http_handler_panics_total` (counter): handler panics by service
//! - `stream_upstream_attempts_total` (counter): dials by result
//! - `stream_active_relays` (gauge): streams currently relayed
//! - `stream_bytes_relayed_total` (counter): audio bytes sent to clients
//! - `edge_metadata_lookups_total` (counter): lookups by outcome
//! - `edge_template_reloads_total` (counter): reloads by result
//!
//! # Design Decisions
//! - The `metrics` facade is a no-op until an exporter is installed
//! - Labels are low-cardinality (no paths, no slugs)

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished request head.
pub fn record_request(service: &'static str, status: u16, start: Instant) {
    counter!("http_requests_total", "service" => service, "status" => status.to_string()).increment(1);
    histogram!("http_request_duration_seconds", "service" => service)
        .record(start.elapsed().as_secs_f64());
}

/// Record a request that ended in a handler panic. No duration is known.
pub fn record_panic(service: &'static str) {
    counter!("http_requests_total", "service" => service, "status" => "500").increment(1);
    counter!("http_handler_panics_total", "service" => service).increment(1);
}

/// Record one upstream dial attempt.
pub fn record_upstream_attempt(result: &'static str) {
    counter!("stream_upstream_attempts_total", "result" => result).increment(1);
}

/// A relay started streaming.
pub fn relay_opened() {
    gauge!("stream_active_relays").increment(1.0);
}

/// A relay ended.
pub fn relay_closed(bytes: u64) {
    gauge!("stream_active_relays").decrement(1.0);
    counter!("stream_bytes_relayed_total").increment(bytes);
}

/// Record a metadata lookup outcome (`found`, `cached`, `not_found`, `error`).
pub fn record_metadata_lookup(outcome: &'static str) {
    counter!("edge_metadata_lookups_total", "outcome" => outcome).increment(1);
}

/// Record a template reload (`ok` or `error`).
pub fn record_template_reload(result: &'static str) {
    counter!("edge_template_reloads_total", "result" => result).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panics_are_counted_without_a_duration() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || record_panic("edge_renderer"));

        let rendered = handle.render();
        assert!(rendered.contains(r#"http_handler_panics_total{service="edge_renderer"} 1"#));
        assert!(rendered.contains(r#"http_requests_total{service="edge_renderer",status="500"} 1"#));
        assert!(!rendered.contains("http_request_duration_seconds"));
    }
}
