//! Per-mock call log.
//!
//! [`CallTracer`] keeps every observed call of one mock in order, together with a
//! verified mark set by successful verifications. [`OrderStamps`] hands out the
//! stamps that order calls across mocks, contexts included.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::call::CallTrace;

/// Monotonic source of call order stamps.
#[derive(Debug, Default)]
pub struct OrderStamps {
    next: AtomicU64,
}

impl OrderStamps {
    /// Create a source starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide source used for every traced call.
    pub fn global() -> &'static OrderStamps {
        static GLOBAL: OnceLock<OrderStamps> = OnceLock::new();
        GLOBAL.get_or_init(OrderStamps::new)
    }

    /// The next stamp.
    pub fn next_stamp(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
struct TracedCall {
    trace: CallTrace,
    verified: bool,
}

/// Append-only log of the calls a mock received.
#[derive(Debug, Default)]
pub struct CallTracer {
    calls: Mutex<Vec<TracedCall>>,
}

impl CallTracer {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a call.
    pub fn record(&self, trace: CallTrace) {
        tracing::trace!(call = %trace, stamp = trace.order_stamp, "call traced");
        self.calls.lock().push(TracedCall {
            trace,
            verified: false,
        });
    }

    /// Every recorded call, oldest first.
    #[must_use]
    pub fn all(&self) -> Vec<CallTrace> {
        self.calls.lock().iter().map(|c| c.trace.clone()).collect()
    }

    /// Calls no verification has consumed yet.
    #[must_use]
    pub fn unverified(&self) -> Vec<CallTrace> {
        self.calls
            .lock()
            .iter()
            .filter(|c| !c.verified)
            .map(|c| c.trace.clone())
            .collect()
    }

    /// Number of recorded calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Mark the given calls as verified.
    pub fn mark_verified(&self, traces: &[CallTrace]) {
        let mut calls = self.calls.lock();
        for call in calls.iter_mut() {
            if traces.iter().any(|t| t.is_same_call(&call.trace)) {
                call.verified = true;
            }
        }
    }

    /// Drop every recorded call.
    pub fn reset(&self) {
        self.calls.lock().clear();
    }
}
