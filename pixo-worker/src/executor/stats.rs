//! Executor counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters updated by the executor and its tasks.
#[derive(Debug, Default)]
pub struct ExecutorStats {
    requests: AtomicU64,
    cancels: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time copy of [`ExecutorStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorStatsSnapshot {
    /// Compress and resize requests received.
    pub requests: u64,
    /// Cancel requests received.
    pub cancels: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Tasks finalized without a response because they were cancelled.
    pub dropped: u64,
}

impl ExecutorStatsSnapshot {
    /// Tasks that reached a terminal state.
    pub fn finalized(&self) -> u64 {
        self.succeeded + self.failed + self.dropped
    }

    /// Tasks received but not yet finalized.
    pub fn in_flight(&self) -> u64 {
        self.requests.saturating_sub(self.finalized())
    }
}

impl ExecutorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cancel(&self) {
        self.cancels.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ExecutorStatsSnapshot {
        ExecutorStatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            cancels: self.cancels.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}
