//! Quarry Extractor
//!
//! Chunked, multi-pass extraction of span-anchored entities from long
//! documents.
//!
//! # Overview
//!
//! A document is split into bounded, overlapping chunks. Every chunk is sent
//! to an extraction capability once per pass, with a bounded number of calls
//! in flight. The capability returns text, not offsets; each result is
//! located in its chunk, translated to document offsets and checked against
//! the document before it is kept. Results of all passes are deduplicated
//! and ordered by position.
//!
//! # Architecture
//!
//! ```text
//! Document → TextChunker → PassScheduler → WorkerPool → ChunkExtractor
//!                                                          ↓
//!          ExtractionSet ← Aggregator ← align_candidates ←─┘
//! ```
//!
//! # Key Features
//!
//! - **Character offsets**: spans count Unicode scalar values, never bytes
//! - **Multi-pass recall**: repeated passes are merged, not duplicated
//! - **Bounded concurrency**: semaphore-gated workers with retry and backoff
//! - **Partial results**: item failures are reported, never fatal on their own
//! - **Cancellation**: stop dispatching and keep what already finished
//!
//! # Example Usage
//!
//! ```no_run
//! use quarry_domain::{Document, ExampleData, ExtractionTask, RawExtraction};
//! use quarry_extractor::{Extractor, ModelExtractor, PipelineConfig};
//! use quarry_llm::OllamaProvider;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = OllamaProvider::new("http://localhost:11434", "llama3")?;
//! let extractor = Extractor::new(ModelExtractor::new(provider), PipelineConfig::default())?;
//!
//! let task = ExtractionTask::new("Extract medications with their dosage.").with_example(
//!     ExampleData::new(
//!         "Take Metformin 500mg twice daily.",
//!         vec![
//!             RawExtraction::new("medication", "Metformin"),
//!             RawExtraction::new("dosage", "500mg"),
//!         ],
//!     ),
//! );
//!
//! let document = Document::from_text("Patient takes Aspirin 81mg once daily by mouth.");
//! let report = extractor.extract(&document, &task).await?;
//!
//! for extraction in report.set.iter() {
//!     println!("{} {:?} @ {}..{}", extraction.class, extraction.text,
//!         extraction.span.start, extraction.span.end);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod aggregator;
mod alignment;
mod chunking;
mod config;
mod error;
mod extractor;
mod io;
mod metrics;
mod model;
mod parser;
mod prompt;
mod scheduler;
mod types;
mod worker;


pub use aggregator::{Aggregation, Aggregator};
pub use alignment::align_candidates;
pub use chunking::{Chunks, TextChunker};
pub use config::{AttributeConflictPolicy, DedupConfig, PipelineConfig};
pub use error::ExtractorError;
pub use extractor::Extractor;
pub use io::{
    load_jsonl, read_jsonl, save_jsonl, write_jsonl, AnnotatedDocument, ExtractionRecord,
};
pub use metrics::PoolCounters;
pub use model::ModelExtractor;
pub use parser::{parse_model_response, MalformedResponse};
pub use prompt::PromptBuilder;
pub use scheduler::{PassScheduler, ScheduleRun};
pub use types::{
    AnomalyKind, DataAnomaly, ExtractionReport, ItemFailure, ItemOutcome, PassStatus,
    PassSummary, WorkItem,
};
pub use worker::{CancellationFlag, ItemResult, PoolRun, RetryPolicy, WorkerPool};
