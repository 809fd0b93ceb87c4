//! Telemetry counters for worker pool runs
//!
//! Each work item accumulates its own counters and hands them back with its
//! result; the pool merges them. Nothing here is shared between tasks.

/// Counters collected while dispatching work items
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolCounters {
    /// Calls issued to the extraction capability, retries included
    pub dispatched: usize,

    /// Work items that eventually succeeded
    pub succeeded: usize,

    /// Work items that failed after exhausting retries or permanently
    pub failed: usize,

    /// Failed work items whose last error was transient (retries ran out)
    pub exhausted: usize,

    /// Retries performed after transient failures
    pub retries: usize,

    /// Transient failures observed (including ones later retried)
    pub transient_errors: usize,

    /// Permanent failures observed
    pub permanent_errors: usize,

    /// Work items never dispatched because of cancellation
    pub skipped: usize,

    /// Candidates returned by successful calls
    pub candidates: usize,
}

impl PoolCounters {
    /// Create new empty counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one call to the capability
    pub fn record_dispatch(&mut self) {
        self.dispatched += 1;
    }

    /// Record a successful item and the number of candidates it produced
    pub fn record_success(&mut self, candidates: usize) {
        self.succeeded += 1;
        self.candidates += candidates;
    }

    /// Record a failed call; `transient` says which kind
    pub fn record_call_error(&mut self, transient: bool) {
        if transient {
            self.transient_errors += 1;
        } else {
            self.permanent_errors += 1;
        }
    }

    /// Record a retry
    pub fn record_retry(&mut self) {
        self.retries += 1;
    }

    /// Record an item that finally failed; `transient` is the class of its last error
    pub fn record_failure(&mut self, transient: bool) {
        self.failed += 1;
        if transient {
            self.exhausted += 1;
        }
    }

    /// Record an item skipped because of cancellation
    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    /// Add another set of counters into this one
    pub fn merge(&mut self, other: &PoolCounters) {
        self.dispatched += other.dispatched;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.exhausted += other.exhausted;
        self.retries += other.retries;
        self.transient_errors += other.transient_errors;
        self.permanent_errors += other.permanent_errors;
        self.skipped += other.skipped;
        self.candidates += other.candidates;
    }

    /// Work items that reached a final state (success or failure)
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Generate a one-line summary of the counters
    pub fn summary(&self) -> String {
        format!(
            "{} succeeded, {} failed, {} skipped, {} calls, {} retries ({} transient / {} permanent errors), {} candidates",
            self.succeeded,
            self.failed,
            self.skipped,
            self.dispatched,
            self.retries,
            self.transient_errors,
            self.permanent_errors,
            self.candidates
        )
    }
}
