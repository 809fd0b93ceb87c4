//! Medication extraction against a local Ollama model
//!
//! ```text
//! OLLAMA_MODEL=llama3 RUST_LOG=quarry_extractor=info \
//!     cargo run -p quarry-extractor --example medical_extraction
//! ```
//!
//! Writes `medical_extractions.jsonl` to the working directory.

use anyhow::Result;
use quarry_domain::{Document, ExampleData, ExtractionTask, RawExtraction};
use quarry_extractor::{save_jsonl, Extractor, ModelExtractor, PipelineConfig};
use quarry_llm::OllamaProvider;
use std::env;
use tracing_subscriber::EnvFilter;

const PROMPT: &str = "\
Extract medications, dosages, and administration routes from clinical text.
Use exact text for extractions. Do not paraphrase or overlap entities.
Provide meaningful attributes for each entity including dosage amounts and frequencies.";

const TEST_CASES: [&str; 4] = [
    "Patient takes Aspirin 81mg once daily for cardioprotection.",
    "Prescribed Amoxicillin 875mg every 12 hours orally for 7 days.",
    "Insulin injection 10 units subcutaneously before meals.",
    "Apply topical hydrocortisone cream 1% to affected area twice daily.",
];

fn medical_task() -> ExtractionTask {
    ExtractionTask::new(PROMPT).with_example(ExampleData::new(
        "Patient was prescribed Metformin 500mg twice daily by mouth.",
        vec![
            RawExtraction::new("medication", "Metformin")
                .with_attribute("drug_class", "antidiabetic")
                .with_attribute("generic_name", "metformin"),
            RawExtraction::new("dosage", "500mg")
                .with_attribute("amount", "500")
                .with_attribute("unit", "mg"),
            RawExtraction::new("frequency", "twice daily")
                .with_attribute("times_per_day", "2")
                .with_attribute("interval", "daily"),
            RawExtraction::new("route", "by mouth").with_attribute("administration", "oral"),
        ],
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let endpoint = env::var("OLLAMA_ENDPOINT").unwrap_or_else(|_| "http://localhost:11434".to_string());
    let model = env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3".to_string());

    let provider = OllamaProvider::new(endpoint, model)?.with_temperature(0.0);
    let extractor = Extractor::new(ModelExtractor::new(provider), PipelineConfig::conservative())?;
    let task = medical_task();

    let documents: Vec<Document> = TEST_CASES
        .iter()
        .enumerate()
        .map(|(i, text)| Document::new(format!("medical_{}", i + 1), *text))
        .collect();

    let reports = extractor.extract_all(&documents, &task).await?;

    for (i, (document, report)) in documents.iter().zip(&reports).enumerate() {
        println!("\nTest Case {}:", i + 1);
        println!("Input: {}", document.text());
        println!("{}", "-".repeat(50));

        if report.set.is_empty() {
            println!("  No extractions found.");
        }
        for (j, extraction) in report.set.iter().enumerate() {
            println!(
                "  {}. {}: '{}' [{}..{}]",
                j + 1,
                extraction.class,
                extraction.text,
                extraction.span.start,
                extraction.span.end
            );
            if !extraction.attributes.is_empty() {
                println!("     Attributes: {:?}", extraction.attributes);
            }
        }
        if report.is_partial() {
            println!("  Partial result: {}", report.summary());
        }
    }

    let written = save_jsonl("medical_extractions.jsonl", reports.iter().map(|r| &r.set))?;
    println!("\nSaved {} annotated documents to medical_extractions.jsonl", written);

    Ok(())
}
