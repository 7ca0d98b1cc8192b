// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric descriptions and recording helpers.
//!
//! All helpers go through the metrics-rs facade and are no-ops until a
//! recorder is installed.

use metrics::{describe_counter, describe_gauge};

/// Describe every tapcount metric. Called once after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "tapcount_updates_total",
        "Update jobs processed, by outcome"
    );
    describe_gauge!("tapcount_queue_depth", "Dispatch queue jobs, by state");
    describe_gauge!(
        "tapcount_tier_paused",
        "1 while backpressure has the tier paused"
    );
    describe_gauge!(
        "tapcount_throughput_per_second",
        "Successful dispatches per second over the last report interval"
    );
}

/// Count one processed job.
pub fn record_update(outcome: &'static str) {
    metrics::counter!("tapcount_updates_total", "outcome" => outcome).increment(1);
}

pub fn set_queue_depth(state: &'static str, depth: usize) {
    metrics::gauge!("tapcount_queue_depth", "state" => state).set(depth as f64);
}

pub fn set_tier_paused(tier: &'static str, paused: bool) {
    metrics::gauge!("tapcount_tier_paused", "tier" => tier).set(if paused { 1.0 } else { 0.0 });
}

pub fn set_throughput(per_second: f64) {
    metrics::gauge!("tapcount_throughput_per_second").set(per_second);
}
