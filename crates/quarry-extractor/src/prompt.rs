//! LLM prompt construction for span extraction

use quarry_domain::{ExampleData, ExtractionTask, RawExtraction};
use serde_json::{json, Value};

/// Builds few-shot prompts for one chunk
pub struct PromptBuilder<'a> {
    task: &'a ExtractionTask,
    text: &'a str,
    max_examples: usize,
}

impl<'a> PromptBuilder<'a> {
    /// Create a new prompt builder for `text`
    pub fn new(task: &'a ExtractionTask, text: &'a str) -> Self {
        Self {
            task,
            text,
            max_examples: 10,
        }
    }

    /// Limit the number of worked examples included
    pub fn with_max_examples(mut self, max_examples: usize) -> Self {
        self.max_examples = max_examples;
        self
    }

    /// Build the complete extraction prompt
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        // 1. Task description
        prompt.push_str(self.task.prompt_description.trim());
        prompt.push_str("\n\n");

        // 2. Format rules
        prompt.push_str(EXTRACTION_RULES);
        prompt.push_str("\n\n");

        // 3. Worked examples
        if !self.task.examples.is_empty() {
            prompt.push_str("Examples:\n\n");
            for example in self.task.examples.iter().take(self.max_examples) {
                prompt.push_str(&render_example(example));
                prompt.push('\n');
            }
        }

        // 4. The text to analyze
        prompt.push_str("Text to analyze:\n");
        prompt.push_str("---\n");
        prompt.push_str(self.text);
        prompt.push_str("\n---\n\n");

        // 5. Output format reminder
        prompt.push_str(OUTPUT_FORMAT_REMINDER);

        prompt
    }
}

fn render_example(example: &ExampleData) -> String {
    let output: Vec<Value> = example.extractions.iter().map(render_extraction).collect();
    let output = serde_json::to_string_pretty(&output).unwrap_or_else(|_| "[]".to_string());
    format!("Input: {}\nOutput:\n{}\n", example.text, output)
}

fn render_extraction(extraction: &RawExtraction) -> Value {
    json!({
        "extraction_class": extraction.class,
        "extraction_text": extraction.text,
        "attributes": extraction.attributes,
    })
}

const EXTRACTION_RULES: &str = r#"Rules:
- Copy extraction_text exactly as it appears in the text; do not paraphrase
- Do not overlap extractions of the same class
- List extractions in order of appearance
- Attribute values must be strings"#;

const OUTPUT_FORMAT_REMINDER: &str = r#"Output format (JSON array only, no additional text):
[
  {
    "extraction_class": "class label",
    "extraction_text": "exact text",
    "attributes": {"key": "value"}
  }
]

Remember: Return ONLY valid JSON. Return [] when nothing matches."#;
