//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the pipeline and the model
//! service. Implementations live in other crates.

use crate::example::ExtractionTask;
use crate::extraction::RawExtraction;
use async_trait::async_trait;
use std::fmt;

/// Failure of one call to the extraction capability
///
/// The pipeline only cares whether a failure is worth retrying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// Rate limiting, timeouts, network blips; retried with backoff
    Transient(String),

    /// Malformed responses, authentication failures, missing models; never retried
    Permanent(String),
}

impl CallError {
    /// Whether the call may succeed if repeated
    pub fn is_transient(&self) -> bool {
        matches!(self, CallError::Transient(_))
    }

    /// The failure message
    pub fn message(&self) -> &str {
        match self {
            CallError::Transient(msg) | CallError::Permanent(msg) => msg,
        }
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::Transient(msg) => write!(f, "transient call error: {}", msg),
            CallError::Permanent(msg) => write!(f, "permanent call error: {}", msg),
        }
    }
}

impl std::error::Error for CallError {}

/// The opaque "extract typed spans from one chunk" capability
///
/// Implemented by the pipeline crate on top of an [`LlmProvider`], and by
/// stubs in tests. Calls may be slow and may fail.
#[async_trait]
pub trait ChunkExtractor: Send + Sync {
    /// Extract zero or more items from `text` according to `task`
    async fn extract_chunk(
        &self,
        text: &str,
        task: &ExtractionTask,
    ) -> Result<Vec<RawExtraction>, CallError>;
}

/// Trait for LLM provider operations
///
/// Implemented by the infrastructure layer (quarry-llm)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Error type for LLM operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Generate a text completion
    async fn generate(&self, prompt: &str) -> Result<String, Self::Error>;

    /// Name of the model behind this provider
    fn model_name(&self) -> &str;
}
