// ABOUTME: Prometheus metrics for relay turns, deltas, feedback, and skipped events.
// ABOUTME: Thin wrappers over the metrics facade plus recorder installation.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const TURNS_TOTAL: &str = "threadline_turns_total";
pub const DELTAS_TOTAL: &str = "threadline_deltas_total";
pub const FEEDBACK_TOTAL: &str = "threadline_feedback_total";
pub const CHANNEL_JOINS_TOTAL: &str = "threadline_channel_joins_total";
pub const EVENTS_SKIPPED_TOTAL: &str = "threadline_events_skipped_total";

/// Install the global Prometheus recorder. Call once at startup.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    Ok(handle)
}

pub fn record_turn(kind: &'static str, outcome: &'static str) {
    counter!(TURNS_TOTAL, "kind" => kind, "outcome" => outcome).increment(1);
}

pub fn record_deltas(count: u64) {
    counter!(DELTAS_TOTAL).increment(count);
}

pub fn record_feedback(rating: &'static str) {
    counter!(FEEDBACK_TOTAL, "rating" => rating).increment(1);
}

pub fn record_channel_join() {
    counter!(CHANNEL_JOINS_TOTAL).increment(1);
}

pub fn record_skipped(reason: &'static str) {
    counter!(EVENTS_SKIPPED_TOTAL, "reason" => reason).increment(1);
}
