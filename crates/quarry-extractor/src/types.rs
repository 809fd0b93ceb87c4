//! Work items, per-pass summaries and the extraction report

use crate::metrics::PoolCounters;
use quarry_domain::{CallError, Chunk, ExtractionCandidate, ExtractionSet, Span};
use std::fmt;

/// One (chunk, pass) pair to send to the extraction capability
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// The chunk to extract from
    pub chunk: Chunk,

    /// Pass this item belongs to
    pub pass_index: usize,
}

/// Final state of one work item
#[derive(Debug, Clone)]
pub enum ItemOutcome {
    /// The call succeeded; candidates are aligned to the chunk
    Completed(Vec<ExtractionCandidate>),

    /// The call failed permanently or ran out of retries
    Failed(ItemFailure),

    /// Never dispatched because the extraction was cancelled
    Skipped,
}

/// A work item that produced no candidates because its calls failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// Pass of the failed item
    pub pass_index: usize,

    /// Chunk of the failed item
    pub chunk_index: usize,

    /// Document range of the chunk
    pub chunk_span: Span,

    /// Calls made for this item
    pub attempts: usize,

    /// The last error observed
    pub error: CallError,
}

/// How a pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStatus {
    /// Every item succeeded
    Completed,
    /// Some items failed, at least one succeeded
    Partial,
    /// Every dispatched item failed permanently
    Failed,
    /// No item succeeded, but some only ran out of retries on transient errors
    Incomplete,
    /// Cancellation stopped the pass before all items were dispatched
    Cancelled,
}

impl fmt::Display for PassStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PassStatus::Completed => "completed",
            PassStatus::Partial => "partial",
            PassStatus::Failed => "failed",
            PassStatus::Incomplete => "incomplete",
            PassStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Outcome counts of one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    /// Zero-based pass index
    pub pass_index: usize,

    /// Work items in the pass
    pub items: usize,

    /// Items that succeeded
    pub succeeded: usize,

    /// Items that failed
    pub failed: usize,

    /// Items skipped by cancellation
    pub skipped: usize,

    /// Final status
    pub status: PassStatus,
}

impl PassSummary {
    /// Summarise a pass from its pool counters
    pub fn from_counters(pass_index: usize, items: usize, counters: &PoolCounters) -> Self {
        let status = if counters.skipped > 0 {
            PassStatus::Cancelled
        } else if counters.failed == 0 {
            PassStatus::Completed
        } else if counters.succeeded > 0 {
            PassStatus::Partial
        } else if counters.exhausted == 0 {
            PassStatus::Failed
        } else {
            PassStatus::Incomplete
        };

        Self {
            pass_index,
            items,
            succeeded: counters.succeeded,
            failed: counters.failed,
            skipped: counters.skipped,
            status,
        }
    }

    /// A pass that never started
    pub fn not_started(pass_index: usize) -> Self {
        Self {
            pass_index,
            items: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            status: PassStatus::Cancelled,
        }
    }
}

/// Why a candidate was dropped by the aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyKind {
    /// The text could not be located in its chunk
    Unaligned,
    /// The span points outside the document
    OutOfBounds,
    /// The document text at the span differs from the extraction text
    TextMismatch,
    /// The span covers no characters
    EmptySpan,
}

/// A candidate dropped for violating the exact-match invariant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataAnomaly {
    /// What was wrong
    pub kind: AnomalyKind,

    /// Class label of the dropped candidate
    pub class: String,

    /// Text of the dropped candidate
    pub text: String,

    /// Document-global span, when one was computed
    pub span: Option<Span>,

    /// Pass of the dropped candidate
    pub pass_index: usize,

    /// Chunk of the dropped candidate
    pub chunk_index: usize,
}

/// Everything an extraction produced for one document
///
/// A report with an empty set and a report with extractions plus failures
/// are both successful outcomes; check [`is_partial`](Self::is_partial) for
/// whether anything went missing.
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    /// The ordered, deduplicated extractions
    pub set: ExtractionSet,

    /// One summary per configured pass
    pub passes: Vec<PassSummary>,

    /// Work items that failed
    pub failures: Vec<ItemFailure>,

    /// Candidates dropped by the exact-match check
    pub anomalies: Vec<DataAnomaly>,

    /// Pool counters merged over all passes
    pub telemetry: PoolCounters,

    /// Whether cancellation stopped the extraction early
    pub cancelled: bool,

    /// Wall-clock time spent (milliseconds)
    pub processing_time_ms: u64,
}

impl ExtractionReport {
    /// Whether some work items failed or were skipped
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty() || self.cancelled
    }

    /// Human-readable one-line description
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{}: {} extractions from {} passes",
            self.set.document_id,
            self.set.len(),
            self.passes.len()
        );
        if !self.failures.is_empty() {
            line.push_str(&format!(", {} failed work items", self.failures.len()));
        }
        if !self.anomalies.is_empty() {
            line.push_str(&format!(", {} dropped candidates", self.anomalies.len()));
        }
        if self.cancelled {
            line.push_str(", cancelled");
        }
        line
    }
}
