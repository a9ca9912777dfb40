//! Dispatch metrics definitions
//!
//! OpenTelemetry instruments recording what the dispatcher does. They bind
//! to the global meter provider, so they export wherever
//! `init_observability` pointed it and cost next to nothing when no provider
//! is installed.
//!
//! # Metrics Collected
//!
//! - **rpcbase.dispatch.requests.total**: candidates processed, by method and status
//! - **rpcbase.dispatch.request.duration**: candidate latency in seconds
//! - **rpcbase.dispatch.batch.size**: batch size distribution, by mode
//! - **rpcbase.dispatch.errors.total**: error responses, by code
//! - **rpcbase.dispatch.notifications.suppressed**: outcomes dropped because
//!   the candidate was a notification
//!
//! # Examples
//!
//! ```rust
//! use rpcbase_server::DispatchMetrics;
//!
//! let metrics = DispatchMetrics::new("billing-rpc");
//! metrics.record_request("add", "success", 0.002);
//! metrics.record_error(-32601);
//! ```

use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
    InstrumentationScope, KeyValue,
};

/// Status label for a candidate that produced a result
pub const STATUS_SUCCESS: &str = "success";
/// Status label for a candidate that produced an error
pub const STATUS_ERROR: &str = "error";
/// Status label for a notification whose outcome was dropped
pub const STATUS_SUPPRESSED: &str = "suppressed";

/// Dispatcher instruments, all prefixed `rpcbase.dispatch.*`
#[derive(Debug, Clone)]
pub struct DispatchMetrics {
    /// Candidates processed
    pub requests_total: Counter<u64>,
    /// Candidate processing duration in seconds
    pub request_duration: Histogram<f64>,
    /// Batch size distribution
    pub batch_size: Histogram<u64>,
    /// Error responses
    pub errors_total: Counter<u64>,
    /// Notification outcomes dropped
    pub notifications_suppressed: Counter<u64>,
}

impl DispatchMetrics {
    /// Create instruments on a meter scoped to `service_name`
    pub fn new(service_name: impl Into<String>) -> Self {
        let scope = InstrumentationScope::builder(service_name.into())
            .with_version(env!("CARGO_PKG_VERSION"))
            .build();
        Self::new_with_meter(&global::meter_with_scope(scope))
    }

    /// Create instruments on an existing meter
    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            requests_total: meter
                .u64_counter("rpcbase.dispatch.requests.total")
                .with_description("Total number of request candidates processed")
                .build(),
            request_duration: meter
                .f64_histogram("rpcbase.dispatch.request.duration")
                .with_description("Candidate processing duration in seconds")
                .with_unit("s")
                .build(),
            batch_size: meter
                .u64_histogram("rpcbase.dispatch.batch.size")
                .with_description("Number of candidates in batch payloads")
                .build(),
            errors_total: meter
                .u64_counter("rpcbase.dispatch.errors.total")
                .with_description("Total number of error responses produced")
                .build(),
            notifications_suppressed: meter
                .u64_counter("rpcbase.dispatch.notifications.suppressed")
                .with_description("Notification outcomes that produced no response")
                .build(),
        }
    }

    /// Record one processed candidate
    pub fn record_request(&self, method: &str, status: &'static str, duration_secs: f64) {
        let attributes = &[
            KeyValue::new("method", method.to_string()),
            KeyValue::new("status", status),
        ];
        self.requests_total.add(1, attributes);
        self.request_duration.record(duration_secs, attributes);
    }

    /// Record a batch payload
    pub fn record_batch(&self, size: usize, mode: &'static str) {
        self.batch_size
            .record(size as u64, &[KeyValue::new("mode", mode)]);
    }

    /// Record an error response with the given code
    pub fn record_error(&self, code: i32) {
        self.errors_total
            .add(1, &[KeyValue::new("code", i64::from(code))]);
    }

    /// Record a suppressed notification outcome
    pub fn record_suppressed(&self) {
        self.notifications_suppressed.add(1, &[]);
    }
}
