//! Prometheus metrics for the feed and wager lifecycle.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use tracing::debug;

// === Metric Name Constants ===

/// Feed ticks received counter metric name.
pub const METRIC_TICKS_RECEIVED: &str = "feed_ticks_received_total";
/// Feed reconnects counter metric name.
pub const METRIC_FEED_RECONNECTS: &str = "feed_reconnects_total";
/// Malformed feed messages counter metric name.
pub const METRIC_MESSAGES_DROPPED: &str = "feed_messages_dropped_total";
/// Backfill failures counter metric name.
pub const METRIC_BACKFILL_FAILURES: &str = "feed_backfill_failures_total";
/// Wagers placed counter metric name.
pub const METRIC_WAGERS_PLACED: &str = "wagers_placed_total";
/// Wagers settled counter metric name.
pub const METRIC_WAGERS_SETTLED: &str = "wagers_settled_total";
/// Wagers aborted counter metric name.
pub const METRIC_WAGERS_ABORTED: &str = "wagers_aborted_total";
/// Rejected placements counter metric name.
pub const METRIC_PLACEMENTS_REJECTED: &str = "placements_rejected_total";
/// Tick processing latency metric name.
pub const METRIC_TICK_LATENCY: &str = "feed_tick_latency_ms";
/// Settlement routine latency metric name.
pub const METRIC_SETTLEMENT_LATENCY: &str = "settlement_latency_ms";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_TICK_LATENCY,
        "Feed tick processing latency in milliseconds"
    );
    describe_histogram!(
        METRIC_SETTLEMENT_LATENCY,
        "Settlement routine latency in milliseconds"
    );

    describe_counter!(METRIC_TICKS_RECEIVED, "Total number of price ticks received");
    describe_counter!(METRIC_FEED_RECONNECTS, "Total number of feed reconnections");
    describe_counter!(
        METRIC_MESSAGES_DROPPED,
        "Total number of malformed feed messages dropped"
    );
    describe_counter!(
        METRIC_BACKFILL_FAILURES,
        "Total number of failed backfill requests"
    );
    describe_counter!(METRIC_WAGERS_PLACED, "Total number of wagers placed");
    describe_counter!(METRIC_WAGERS_SETTLED, "Total number of wagers settled");
    describe_counter!(
        METRIC_WAGERS_ABORTED,
        "Total number of wagers aborted on disconnect"
    );
    describe_counter!(
        METRIC_PLACEMENTS_REJECTED,
        "Total number of rejected placement attempts"
    );

    debug!("Metrics initialized");
}

/// Record feed tick processing latency.
pub fn record_tick_latency(start: Instant) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_TICK_LATENCY).record(latency_ms);
}

/// Record settlement routine latency.
pub fn record_settlement_latency(start: Instant) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_SETTLEMENT_LATENCY).record(latency_ms);
}

/// Increment ticks received counter.
pub fn inc_ticks_received() {
    counter!(METRIC_TICKS_RECEIVED).increment(1);
}

/// Increment feed reconnects counter.
pub fn inc_feed_reconnects() {
    counter!(METRIC_FEED_RECONNECTS).increment(1);
}

/// Increment dropped messages counter.
pub fn inc_messages_dropped() {
    counter!(METRIC_MESSAGES_DROPPED).increment(1);
}

/// Increment backfill failures counter.
pub fn inc_backfill_failures() {
    counter!(METRIC_BACKFILL_FAILURES).increment(1);
}

/// Increment wagers placed counter.
pub fn inc_wagers_placed() {
    counter!(METRIC_WAGERS_PLACED).increment(1);
}

/// Increment wagers settled counter.
pub fn inc_wagers_settled() {
    counter!(METRIC_WAGERS_SETTLED).increment(1);
}

/// Increment wagers aborted counter.
pub fn inc_wagers_aborted() {
    counter!(METRIC_WAGERS_ABORTED).increment(1);
}

/// Increment rejected placements counter.
pub fn inc_placements_rejected() {
    counter!(METRIC_PLACEMENTS_REJECTED).increment(1);
}
