//! Driver metrics
//!
//! Counters and histograms for array operations, gateway logins and wait
//! timeouts. Recording goes through the `metrics` facade; installing an
//! exporter is left to the host process.

use std::time::Instant;

use metrics::{counter, histogram};

/// Metric names
pub mod names {
    /// Counter: Total number of driver operations by type and status
    pub const VMEM_OPERATIONS_TOTAL: &str = "vmem_operations_total";
    /// Histogram: Duration of driver operations in seconds
    pub const VMEM_OPERATION_DURATION_SECONDS: &str = "vmem_operation_duration_seconds";
    /// Counter: Gateway logins performed, by outcome
    pub const VMEM_GATEWAY_LOGINS_TOTAL: &str = "vmem_gateway_logins_total";
    /// Counter: Poll loops that exhausted their attempt budget
    pub const VMEM_POLL_TIMEOUTS_TOTAL: &str = "vmem_poll_timeouts_total";
}

/// Record a driver operation with its result
pub fn record_operation(operation: &str, status: &str, duration_secs: f64) {
    counter!(
        names::VMEM_OPERATIONS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(names::VMEM_OPERATION_DURATION_SECONDS, "operation" => operation.to_string())
        .record(duration_secs);
}

/// Record a login round (`relogin` is false when every session was fresh)
pub fn record_login(success: bool, relogin: bool) {
    if success && !relogin {
        return;
    }
    counter!(names::VMEM_GATEWAY_LOGINS_TOTAL, "success" => success.to_string()).increment(1);
}

pub fn record_poll_timeout(what: &str) {
    counter!(names::VMEM_POLL_TIMEOUTS_TOTAL, "what" => what.to_string()).increment(1);
}

/// Helper for timing operations
pub struct OperationTimer {
    operation: &'static str,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }

    pub fn success(self) {
        record_operation(self.operation, "success", self.start.elapsed().as_secs_f64());
    }

    pub fn failure(self, error_code: &str) {
        record_operation(self.operation, error_code, self.start.elapsed().as_secs_f64());
    }

    /// Complete the timer from an operation result, passing it through.
    pub fn finish<T>(self, result: crate::error::Result<T>) -> crate::error::Result<T> {
        match &result {
            Ok(_) => self.success(),
            Err(e) => self.failure(e.code()),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_operation_timer_passes_result_through() {
        let ok = OperationTimer::new("create_volume").finish(Ok(5));
        assert_eq!(ok.unwrap(), 5);

        let err = OperationTimer::new("create_volume")
            .finish::<()>(Err(Error::NodeNotFound("/x".into())));
        assert_eq!(err.unwrap_err().code(), "not_found");
    }

    #[test]
    fn test_recorders_without_exporter() {
        // No recorder installed: calls are no-ops
        record_login(true, true);
        record_login(false, false);
        record_poll_timeout("lock");
    }
}
