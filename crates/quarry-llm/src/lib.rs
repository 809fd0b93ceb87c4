//! Quarry LLM Provider Layer
//!
//! Pluggable LLM provider implementations.
//!
//! # Architecture
//!
//! This crate provides implementations of the `LlmProvider` trait from `quarry-domain`.
//! Every provider reports failures as [`LlmError`], which maps onto the
//! pipeline's transient/permanent [`CallError`] split so the worker pool knows
//! what to retry.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic, scriptable mock for testing
//! - `OllamaProvider`: Local Ollama API integration
//!
//! # Examples
//!
//! ```
//! use quarry_llm::MockProvider;
//! use quarry_domain::LlmProvider;
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = rt.block_on(provider.generate("test prompt")).unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! ```

#![warn(missing_docs)]

pub mod ollama;

use async_trait::async_trait;
use quarry_domain::{CallError, LlmProvider};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use ollama::OllamaProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Request did not complete in time
    #[error("Request timed out")]
    Timeout,

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Credentials rejected by the service
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl LlmError {
    /// Whether repeating the request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::Communication(_) | LlmError::Timeout | LlmError::RateLimitExceeded
        )
    }
}

impl From<LlmError> for CallError {
    fn from(e: LlmError) -> Self {
        if e.is_transient() {
            CallError::Transient(e.to_string())
        } else {
            CallError::Permanent(e.to_string())
        }
    }
}

/// Mock LLM provider for deterministic testing
///
/// Resolution order for each call:
/// 1. the next scripted outcome, if any were queued with
///    [`push_response`](Self::push_response) / [`push_error`](Self::push_error)
/// 2. the response registered for the first key contained in the prompt
/// 3. the default response
///
/// Clones share state, so a clone handed to the pipeline still reports
/// its calls to the original.
///
/// # Examples
///
/// ```
/// use quarry_llm::{LlmError, MockProvider};
/// use quarry_domain::LlmProvider;
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// let provider = MockProvider::new("[]");
/// provider.push_error(LlmError::RateLimitExceeded);
///
/// assert!(rt.block_on(provider.generate("any prompt")).is_err());
/// assert_eq!(rt.block_on(provider.generate("any prompt")).unwrap(), "[]");
/// assert_eq!(provider.call_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    responses: Arc<Mutex<Vec<(String, String)>>>,
    script: Arc<Mutex<VecDeque<Result<String, LlmError>>>>,
    call_count: Arc<Mutex<usize>>,
    prompts: Arc<Mutex<HashMap<usize, String>>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            responses: Arc::new(Mutex::new(Vec::new())),
            script: Arc::new(Mutex::new(VecDeque::new())),
            call_count: Arc::new(Mutex::new(0)),
            prompts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Respond with `response` whenever the prompt contains `key`
    ///
    /// Keys are checked in registration order.
    pub fn add_response(&self, key: impl Into<String>, response: impl Into<String>) {
        self.lock_responses().push((key.into(), response.into()));
    }

    /// Queue a response for the next unscripted call
    pub fn push_response(&self, response: impl Into<String>) {
        self.lock_script().push_back(Ok(response.into()));
    }

    /// Queue a failure for the next unscripted call
    pub fn push_error(&self, error: LlmError) {
        self.lock_script().push_back(Err(error));
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The prompt received by the n-th call (zero based)
    pub fn prompt(&self, call: usize) -> Option<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&call)
            .cloned()
    }

    /// Reset the call count and recorded prompts
    pub fn reset_call_count(&self) {
        *self.call_count.lock().unwrap_or_else(|e| e.into_inner()) = 0;
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, Vec<(String, String)>> {
        self.responses.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, LlmError>>> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn respond(&self, prompt: &str) -> Result<String, LlmError> {
        let call = {
            let mut count = self.call_count.lock().unwrap_or_else(|e| e.into_inner());
            *count += 1;
            *count - 1
        };
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(call, prompt.to_string());

        if let Some(outcome) = self.lock_script().pop_front() {
            return outcome;
        }

        let responses = self.lock_responses();
        if let Some((_, response)) = responses.iter().find(|(key, _)| prompt.contains(key.as_str())) {
            return Ok(response.clone());
        }

        Ok(self.default_response.clone())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("[]")
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    type Error = LlmError;

    async fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        self.respond(prompt)
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider_default() {
        let provider = MockProvider::new("Test response");
        let result = provider.generate("any prompt").await;
        assert_eq!(result.unwrap(), "Test response");
    }

    #[tokio::test]
    async fn test_mock_provider_keyed_responses() {
        let provider = MockProvider::default();
        provider.add_response("Aspirin", "aspirin-response");
        provider.add_response("Metformin", "metformin-response");

        assert_eq!(
            provider.generate("text: Patient takes Aspirin").await.unwrap(),
            "aspirin-response"
        );
        assert_eq!(
            provider.generate("text: Metformin 500mg").await.unwrap(),
            "metformin-response"
        );
        assert_eq!(provider.generate("unknown").await.unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_mock_provider_script_takes_precedence() {
        let provider = MockProvider::new("default");
        provider.add_response("key", "keyed");
        provider.push_response("first");
        provider.push_error(LlmError::Timeout);

        assert_eq!(provider.generate("key").await.unwrap(), "first");
        assert_eq!(provider.generate("key").await.unwrap_err(), LlmError::Timeout);
        assert_eq!(provider.generate("key").await.unwrap(), "keyed");
    }

    #[tokio::test]
    async fn test_mock_provider_call_count() {
        let provider = MockProvider::new("test");

        assert_eq!(provider.call_count(), 0);

        provider.generate("prompt1").await.unwrap();
        assert_eq!(provider.call_count(), 1);

        provider.generate("prompt2").await.unwrap();
        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.prompt(1).as_deref(), Some("prompt2"));

        provider.reset_call_count();
        assert_eq!(provider.call_count(), 0);
        assert!(provider.prompt(0).is_none());
    }

    #[tokio::test]
    async fn test_mock_provider_clone_shares_state() {
        let provider1 = MockProvider::new("test");
        let provider2 = provider1.clone();

        provider1.generate("test").await.unwrap();

        assert_eq!(provider1.call_count(), 1);
        assert_eq!(provider2.call_count(), 1);
    }

    #[test]
    fn test_error_classification() {
        assert!(LlmError::RateLimitExceeded.is_transient());
        assert!(LlmError::Timeout.is_transient());
        assert!(LlmError::Communication("reset".into()).is_transient());
        assert!(!LlmError::InvalidResponse("html".into()).is_transient());
        assert!(!LlmError::Authentication("bad key".into()).is_transient());
        assert!(!LlmError::ModelNotAvailable("x".into()).is_transient());
    }

    #[test]
    fn test_into_call_error() {
        let transient: CallError = LlmError::RateLimitExceeded.into();
        assert!(transient.is_transient());

        let permanent: CallError = LlmError::Authentication("denied".into()).into();
        assert!(!permanent.is_transient());
        assert!(permanent.message().contains("denied"));
    }
}
