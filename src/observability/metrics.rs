//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_messages_total` (counter): inbound events by canonical `event`
//! - `relay_malformed_messages_total` (counter): rejected inbound text by `event`
//! - `relay_call_requests_total` (counter): call requests by `outcome` (reserved, rejected)
//! - `relay_availability_broadcasts_total` (counter): availability fan-outs
//! - `relay_sessions_swept_total` (counter): sessions removed by the liveness sweeper
//! - `relay_event_duration_seconds` (histogram): broker handling time by event `kind`
//! - `relay_sessions` (gauge): registered sessions
//! - `relay_providers_available` (gauge): size of the provider pool
//! - `relay_requesters_waiting` (gauge): size of the requester queue
//! - `relay_channels_open` (gauge): open WebSocket channels
//!
//! # Cardinality
//! `event` and `kind` are bounded by the closed set of client events.
//! `outcome` has two values.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

use crate::session::PoolStats;

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
///
/// Must run inside a Tokio runtime. Fails if a recorder is already installed.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full("relay_event_duration_seconds".to_string()),
            &[0.0001, 0.0005, 0.001, 0.005, 0.010, 0.050, 0.100],
        )
        .map_err(|e| format!("Failed to set event duration buckets: {e}"))?
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_message(event: &str) {
    counter!("relay_messages_total", "event" => event.to_string()).increment(1);
}

pub fn record_malformed_message(event: &str) {
    counter!("relay_malformed_messages_total", "event" => event.to_string()).increment(1);
}

pub fn record_call_request(outcome: &str) {
    counter!("relay_call_requests_total", "outcome" => outcome.to_string()).increment(1);
}

/// Count one availability fan-out and how many channels it reached.
pub fn record_availability_broadcast(delivered: usize) {
    counter!("relay_availability_broadcasts_total").increment(1);
    counter!("relay_availability_deliveries_total").increment(delivered as u64);
}

pub fn record_sessions_swept(removed: usize) {
    counter!("relay_sessions_swept_total").increment(removed as u64);
}

/// Record how long the broker spent on one event.
pub fn record_event_duration(kind: &'static str, duration: Duration) {
    histogram!("relay_event_duration_seconds", "kind" => kind).record(duration.as_secs_f64());
}

/// Mirror pool sizes into gauges.
#[allow(clippy::cast_precision_loss)]
pub fn record_pool_stats(stats: &PoolStats) {
    gauge!("relay_sessions").set(stats.sessions as f64);
    gauge!("relay_providers_available").set(stats.providers_available as f64);
    gauge!("relay_requesters_waiting").set(stats.requesters_waiting as f64);
}

#[allow(clippy::cast_precision_loss)]
pub fn record_channels_open(count: usize) {
    gauge!("relay_channels_open").set(count as f64);
}
