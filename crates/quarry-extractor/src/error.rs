//! Error types for the Extractor

use thiserror::Error;

/// Errors that can occur during extraction
///
/// Only configuration problems and "every pass failed" abort an extraction.
/// Item-level call failures and data anomalies are reported inside the
/// [`ExtractionReport`](crate::ExtractionReport) instead.
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Invalid pipeline parameters, raised before any work is dispatched
    #[error("Configuration error: {0}")]
    Config(String),

    /// Every executed pass failed permanently for every work item
    #[error("All {passes} extraction passes failed (last error: {last_error})")]
    AllPassesFailed {
        /// Number of passes that ran
        passes: usize,
        /// Message of the last recorded item failure
        last_error: String,
    },

    /// A worker task panicked or was aborted
    #[error("Worker task failed: {0}")]
    Worker(String),

    /// Reading or writing persisted results failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
