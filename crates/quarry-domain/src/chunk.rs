//! Chunks - bounded windows over a Document

/// A contiguous `[start, end)` character range of a Document plus its text
///
/// Chunks are produced by the chunker, handed to the worker pool and dropped
/// once their results are merged. Consecutive chunks may overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of the chunk in the chunk sequence
    pub index: usize,

    /// Start offset (characters) in the Document
    pub start: usize,

    /// End offset (characters, exclusive) in the Document
    pub end: usize,

    /// The chunk's local text
    pub text: String,
}

impl Chunk {
    /// Length in characters
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the chunk covers no characters
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}
