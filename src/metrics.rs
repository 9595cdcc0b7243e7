//! Metrics instrumentation for overlay-dns.
//!
//! All metrics are prefixed with `overlay_dns.`

use metrics::{counter, gauge, histogram};
use std::time::Instant;

/// Record a DNS query.
pub fn record_query(record_type: &str, result: QueryResult, duration: std::time::Duration) {
    let result_str = match result {
        QueryResult::Success => "success",
        QueryResult::NxDomain => "nxdomain",
        QueryResult::Error => "error",
    };

    counter!("overlay_dns.query.count", "type" => record_type.to_string(), "result" => result_str)
        .increment(1);
    histogram!("overlay_dns.query.duration.seconds", "type" => record_type.to_string())
        .record(duration.as_secs_f64());
}

/// Query result type for metrics.
#[derive(Debug, Clone, Copy)]
pub enum QueryResult {
    /// Query returned records successfully.
    Success,
    /// Name not found.
    NxDomain,
    /// Query failed with an error.
    Error,
}

/// Record IPs returned for a successful A lookup.
pub fn record_a_ips_returned(count: usize) {
    histogram!("overlay_dns.query.a.ips_returned").record(count as f64);
}

/// Record entries learnt from a merge (local add or foreign gossip).
pub fn record_merge_novel(count: usize) {
    if count > 0 {
        counter!("overlay_dns.merge.novel.count").increment(count as u64);
    }
}

/// Record a rejected gossip payload.
pub fn record_gossip_decode_error() {
    counter!("overlay_dns.gossip.decode_error.count").increment(1);
}

/// Record tombstones discarded by the reaper.
pub fn record_reaper_removed(count: usize) {
    counter!("overlay_dns.reaper.removed.count").increment(count as u64);
}

/// Record state gauges (call periodically or on change).
pub fn record_state_counts(entries: usize, tombstones: usize) {
    gauge!("overlay_dns.state.entries.count").set(entries as f64);
    gauge!("overlay_dns.state.tombstones.count").set(tombstones as f64);
}

/// Helper for timing operations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
