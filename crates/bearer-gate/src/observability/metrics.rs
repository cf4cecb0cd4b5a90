//! Metrics emitted by the authentication gate.
//!
//! Prometheus naming conventions:
//! - `bearer_gate_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `status`: 2 values (success, rejected)
//! - `reason`: the fixed set of rejection codes, plus `none`

use metrics::{counter, histogram};
use std::time::Duration;

/// Counter of pipeline runs.
pub const AUTHENTICATIONS_TOTAL: &str = "bearer_gate_authentications_total";

/// Histogram of pipeline run duration.
pub const AUTHENTICATION_DURATION_SECONDS: &str = "bearer_gate_authentication_duration_seconds";

/// `status` label for an authenticated request.
pub const STATUS_SUCCESS: &str = "success";

/// `status` label for a rejected request.
pub const STATUS_REJECTED: &str = "rejected";

/// Record one authentication pipeline run.
///
/// Metrics: `bearer_gate_authentications_total`,
/// `bearer_gate_authentication_duration_seconds`
/// Labels: `status`, `reason` (counter only)
pub fn record_authentication(status: &'static str, reason: &'static str, duration: Duration) {
    histogram!(AUTHENTICATION_DURATION_SECONDS, "status" => status)
        .record(duration.as_secs_f64());

    counter!(AUTHENTICATIONS_TOTAL, "status" => status, "reason" => reason).increment(1);
}
