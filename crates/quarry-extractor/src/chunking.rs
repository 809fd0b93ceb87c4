//! Fixed-window text chunking with overlap

use crate::error::ExtractorError;
use quarry_domain::{Chunk, Document};

/// Splits documents into bounded, overlapping character windows
///
/// Every chunk except the last is exactly `max_chunk_size` characters long,
/// and consecutive chunks share exactly `overlap` characters, so a mention
/// straddling one boundary appears whole in at least one chunk as long as it
/// is no longer than the overlap.
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    max_chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    /// Create a new text chunker
    ///
    /// Fails with [`ExtractorError::Config`] if `max_chunk_size` is zero or
    /// `overlap` is not smaller than it.
    pub fn new(max_chunk_size: usize, overlap: usize) -> Result<Self, ExtractorError> {
        if max_chunk_size == 0 {
            return Err(ExtractorError::Config(
                "chunk size must be greater than 0".to_string(),
            ));
        }
        if overlap >= max_chunk_size {
            return Err(ExtractorError::Config(format!(
                "chunk overlap {} must be smaller than chunk size {}",
                overlap, max_chunk_size
            )));
        }
        Ok(Self {
            max_chunk_size,
            overlap,
        })
    }

    /// Lazily chunk the given document
    pub fn chunk<'a>(&self, document: &'a Document) -> Chunks<'a> {
        Chunks {
            document,
            size: self.max_chunk_size,
            overlap: self.overlap,
            next_start: Some(0),
            index: 0,
        }
    }
}

/// Iterator over the chunks of one document, see [`TextChunker::chunk`]
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    document: &'a Document,
    size: usize,
    overlap: usize,
    next_start: Option<usize>,
    index: usize,
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let start = self.next_start?;
        let len = self.document.char_len();
        let end = (start + self.size).min(len);

        let chunk = Chunk {
            index: self.index,
            start,
            end,
            text: self.document.slice(start, end).unwrap_or_default().to_string(),
        };

        self.index += 1;
        self.next_start = if end >= len {
            None
        } else {
            Some(end - self.overlap)
        };

        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match self.next_start {
            None => 0,
            Some(start) => {
                let len = self.document.char_len();
                let step = self.size - self.overlap;
                let first_end = start + self.size;
                if first_end >= len {
                    1
                } else {
                    1 + (len - first_end).div_ceil(step)
                }
            }
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Chunks<'_> {}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: chunks cover [0, len) with no gaps and exact overlap
        #[test]
        fn test_chunks_cover_document(text in "\\PC{0,300}", size in 1usize..60, overlap_seed in 0usize..60) {
            let overlap = overlap_seed % size;
            let doc = Document::new("p", text);
            let chunker = TextChunker::new(size, overlap).unwrap();
            let chunks: Vec<Chunk> = chunker.chunk(&doc).collect();

            prop_assert!(!chunks.is_empty());
            prop_assert_eq!(chunks[0].start, 0);
            prop_assert_eq!(chunks.last().unwrap().end, doc.char_len());

            for chunk in &chunks {
                prop_assert!(chunk.len() <= size);
                prop_assert_eq!(Some(chunk.text.as_str()), doc.slice(chunk.start, chunk.end));
            }
            for pair in chunks.windows(2) {
                prop_assert_eq!(pair[0].len(), size);
                prop_assert_eq!(pair[0].end - pair[1].start, overlap);
            }
        }

        /// Property: a document no longer than the chunk size is one chunk
        #[test]
        fn test_short_document_single_chunk(text in "[a-z ]{0,40}", extra in 0usize..20) {
            let doc = Document::new("p", text);
            let size = doc.char_len().max(1) + extra;
            let chunker = TextChunker::new(size, 0).unwrap();
            prop_assert_eq!(chunker.chunk(&doc).count(), 1);
        }
    }
}
