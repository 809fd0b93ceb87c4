//! Few-shot examples and the task description handed to the capability

use crate::extraction::RawExtraction;

/// A worked example: a text and the extractions expected from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleData {
    /// Example source text
    pub text: String,

    /// Extractions expected for `text`
    pub extractions: Vec<RawExtraction>,
}

impl ExampleData {
    /// Create an example
    pub fn new(text: impl Into<String>, extractions: Vec<RawExtraction>) -> Self {
        Self {
            text: text.into(),
            extractions,
        }
    }
}

/// What to extract: the prompt description plus its examples
///
/// One task is shared by every chunk and pass of an extraction request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractionTask {
    /// Natural-language description of what to extract
    pub prompt_description: String,

    /// Few-shot examples
    pub examples: Vec<ExampleData>,
}

impl ExtractionTask {
    /// Create a task without examples
    pub fn new(prompt_description: impl Into<String>) -> Self {
        Self {
            prompt_description: prompt_description.into(),
            examples: Vec::new(),
        }
    }

    /// Add a worked example
    pub fn with_example(mut self, example: ExampleData) -> Self {
        self.examples.push(example);
        self
    }
}
