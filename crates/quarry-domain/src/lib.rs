//! Quarry Domain Layer
//!
//! Core data model and capability traits for the Quarry extraction pipeline.
//! Apart from UUID generation and `async-trait` this crate has no external
//! dependencies; infrastructure lives in `quarry-llm` and the pipeline in
//! `quarry-extractor`.
//!
//! ## Key Concepts
//!
//! - **Document**: immutable source text with a stable identifier; every offset
//!   in the system is a character offset into a Document
//! - **Chunk**: a bounded, possibly overlapping window of a Document
//! - **ExtractionCandidate**: one typed span returned for one chunk in one pass
//! - **Extraction**: a candidate anchored to Document offsets and deduplicated
//! - **ExtractionSet**: the ordered, persisted result for one Document
//!
//! ## Capabilities
//!
//! - [`traits::ChunkExtractor`]: the opaque "extract typed spans from one chunk"
//!   call, which may fail transiently or permanently
//! - [`traits::LlmProvider`]: raw text generation used by model-backed extractors

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunk;
pub mod document;
pub mod example;
pub mod extraction;
pub mod traits;

// Re-exports for convenience
pub use chunk::Chunk;
pub use document::{Document, DocumentId};
pub use example::{ExampleData, ExtractionTask};
pub use extraction::{
    Attributes, Extraction, ExtractionCandidate, ExtractionSet, RawExtraction, Span,
};
pub use traits::{CallError, ChunkExtractor, LlmProvider};
