//! Metrics for observability.
//!
//! Exports Prometheus-compatible metrics for:
//! - History page reads and replay throughput
//! - Replication cursor fan-out
//! - Conditional write outcomes
//! - Shard ownership loss
//! - SLO violations
//!
//! # Metric Naming Convention
//!
//! All metrics are prefixed with `history_reset_` and follow Prometheus conventions:
//! - Counters end in `_total`
//! - Gauges represent current state
//! - Histograms track distributions (duration, size)
//!
//! # Usage
//!
//! ```rust,no_run
//! use history_conflict_resolver::metrics;
//! use std::time::Duration;
//!
//! // In the replayer after each page
//! metrics::record_history_page_read(100, 4096, Duration::from_millis(12));
//!
//! // In the resolver after the conditional write
//! metrics::record_cas_outcome("applied", Duration::from_millis(8));
//! ```

use metrics::{counter, gauge, histogram};
use std::time::Duration;

// =============================================================================
// Replay Metrics
// =============================================================================

/// Record one history page read.
pub fn record_history_page_read(events: usize, bytes: i64, duration: Duration) {
    counter!("history_reset_pages_read_total").increment(1);
    counter!("history_reset_events_read_total").increment(events as u64);
    if bytes > 0 {
        counter!("history_reset_history_bytes_total").increment(bytes as u64);
    }
    histogram!("history_reset_page_read_duration_seconds").record(duration.as_secs_f64());
}

/// Record a completed replay.
pub fn record_replay(events_folded: usize, history_size: i64, duration: Duration) {
    counter!("history_reset_replays_total").increment(1);
    counter!("history_reset_events_replayed_total").increment(events_folded as u64);
    histogram!("history_reset_history_size_bytes").record(history_size.max(0) as f64);
    histogram!("history_reset_replay_duration_seconds").record(duration.as_secs_f64());
}

/// Number of regions holding a replication cursor after a fold.
pub fn record_regions_observed(count: usize) {
    histogram!("history_reset_regions_observed").record(count as f64);
}

// =============================================================================
// Write Metrics
// =============================================================================

/// Record the outcome of a conditional write (`applied`, `stale`, `fenced`, `error`).
pub fn record_cas_outcome(outcome: &str, duration: Duration) {
    counter!("history_reset_cas_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("history_reset_cas_duration_seconds", "outcome" => outcome.to_string())
        .record(duration.as_secs_f64());
}

/// Record a finished reset, successful or not.
pub fn record_reset(success: bool, duration: Duration) {
    let status = if success { "success" } else { "failure" };
    counter!("history_reset_resets_total", "status" => status).increment(1);
    histogram!("history_reset_reset_duration_seconds").record(duration.as_secs_f64());
}

/// Record errors by kind.
pub fn record_error(kind: &str) {
    counter!("history_reset_errors_total", "kind" => kind.to_string()).increment(1);
}

/// Record a shard losing ownership.
pub fn record_shard_ownership_lost(shard_id: i32) {
    counter!("history_reset_shard_ownership_lost_total", "shard_id" => shard_id.to_string())
        .increment(1);
    gauge!("history_reset_shard_owned", "shard_id" => shard_id.to_string()).set(0.0);
}

// =============================================================================
// SLO Violation Metrics
// =============================================================================

/// Record an SLO violation (latency threshold exceeded).
///
/// Labels:
/// - `slo_type`: The type of SLO violated (page_read, replay, cas)
pub fn record_slo_violation(slo_type: &str, latency_ms: u64) {
    counter!("history_reset_slo_violations_total", "slo_type" => slo_type.to_string())
        .increment(1);
    histogram!("history_reset_slo_violation_latency_ms", "slo_type" => slo_type.to_string())
        .record(latency_ms as f64);
}
