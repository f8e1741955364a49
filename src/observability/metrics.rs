//! Metrics collection.
//!
//! # Metrics
//! - `evt_remote_calls_total` (counter): remote calls by endpoint, outcome
//! - `evt_remote_call_duration_seconds` (histogram): latency by endpoint
//! - `evt_transactions_pushed_total` (counter): pushes by outcome
//! - `evt_signatures_total` (counter): signatures by path (single, multi)
//!
//! Nothing is exported from here; the embedding application installs a recorder.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static ENABLED: AtomicBool = AtomicBool::new(true);

/// Turn metric recording on or off process-wide.
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

fn enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Record one remote call to the chain node.
pub fn record_remote_call(endpoint: &'static str, success: bool, elapsed: Duration) {
    if !enabled() {
        return;
    }
    let outcome = if success { "ok" } else { "error" };
    metrics::counter!("evt_remote_calls_total", "endpoint" => endpoint, "outcome" => outcome)
        .increment(1);
    metrics::histogram!("evt_remote_call_duration_seconds", "endpoint" => endpoint)
        .record(elapsed.as_secs_f64());
}

/// Record the final outcome of a push.
pub fn record_push(executed: bool) {
    if !enabled() {
        return;
    }
    let outcome = if executed { "executed" } else { "failed" };
    metrics::counter!("evt_transactions_pushed_total", "outcome" => outcome).increment(1);
}

/// Record signatures produced for one transaction.
pub fn record_signatures(path: &'static str, count: usize) {
    if !enabled() {
        return;
    }
    metrics::counter!("evt_signatures_total", "path" => path).increment(count as u64);
}
