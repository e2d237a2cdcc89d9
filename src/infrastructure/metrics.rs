//! Page cache metrics
//!
//! Counters are recorded through the `metrics` facade; without an installed
//! recorder they are no-ops.

use std::fmt;
use std::sync::Once;

use metrics::{counter, describe_counter, Unit};

static METRIC_DESCRIPTIONS: Once = Once::new();

/// How a request was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
    Bypass,
    Action,
    NotModified,
}

impl CacheOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOutcome::Hit => "hit",
            CacheOutcome::Miss => "miss",
            CacheOutcome::Bypass => "bypass",
            CacheOutcome::Action => "action",
            CacheOutcome::NotModified => "not_modified",
        }
    }
}

impl fmt::Display for CacheOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registers metric descriptions with the installed recorder
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "cachetop_requests_total",
            Unit::Count,
            "Requests seen by the page cache, by outcome."
        );
        describe_counter!(
            "cachetop_store_errors_total",
            Unit::Count,
            "Store and metadata failures swallowed by the page cache."
        );
    });
}

/// Record how a request was answered
pub fn record_request(outcome: CacheOutcome) {
    counter!("cachetop_requests_total", "outcome" => outcome.as_str()).increment(1);
}

/// Record a swallowed store failure
pub fn record_store_error(operation: &'static str) {
    counter!("cachetop_store_errors_total", "operation" => operation).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(CacheOutcome::Hit.to_string(), "hit");
        assert_eq!(CacheOutcome::NotModified.as_str(), "not_modified");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        describe_metrics();
        describe_metrics();
        record_request(CacheOutcome::Miss);
        record_store_error("get");
    }
}
