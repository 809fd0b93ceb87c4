//! [`ChunkExtractor`] backed by an [`LlmProvider`]

use crate::parser::parse_model_response;
use crate::prompt::PromptBuilder;
use async_trait::async_trait;
use quarry_domain::{CallError, ChunkExtractor, ExtractionTask, LlmProvider, RawExtraction};
use tracing::debug;

/// Extracts from a chunk by prompting a language model
///
/// Provider errors are classified by the provider's own error type; an
/// answer that cannot be parsed is a permanent failure.
pub struct ModelExtractor<P> {
    provider: P,
    max_examples: usize,
}

impl<P> ModelExtractor<P>
where
    P: LlmProvider,
    P::Error: Into<CallError>,
{
    /// Wrap a provider
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            max_examples: 10,
        }
    }

    /// Limit the few-shot examples included in each prompt
    pub fn with_max_examples(mut self, max_examples: usize) -> Self {
        self.max_examples = max_examples;
        self
    }

    /// The wrapped provider
    pub fn provider(&self) -> &P {
        &self.provider
    }
}

#[async_trait]
impl<P> ChunkExtractor for ModelExtractor<P>
where
    P: LlmProvider,
    P::Error: Into<CallError>,
{
    async fn extract_chunk(
        &self,
        text: &str,
        task: &ExtractionTask,
    ) -> Result<Vec<RawExtraction>, CallError> {
        let prompt = PromptBuilder::new(task, text)
            .with_max_examples(self.max_examples)
            .build();

        debug!(
            model = self.provider.model_name(),
            prompt_len = prompt.len(),
            "Calling model"
        );

        let response = self
            .provider
            .generate(&prompt)
            .await
            .map_err(Into::<CallError>::into)?;

        parse_model_response(&response).map_err(|e| CallError::Permanent(e.to_string()))
    }
}
