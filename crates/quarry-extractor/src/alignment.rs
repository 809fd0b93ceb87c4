//! Locate model-returned text inside the chunk it came from

use quarry_domain::{Chunk, ExtractionCandidate, RawExtraction, Span};

/// Anchor raw extractions to chunk-local character spans
///
/// Items are searched in order: first from the end of the previous match
/// (models list extractions in order of appearance, so repeated words map
/// to successive occurrences), then from the chunk start. Items whose text
/// does not occur in the chunk keep `span: None`.
pub fn align_candidates(
    chunk: &Chunk,
    pass_index: usize,
    items: Vec<RawExtraction>,
) -> Vec<ExtractionCandidate> {
    let text = chunk.text.as_str();
    let mut cursor = 0usize;

    items
        .into_iter()
        .map(|item| {
            let found = text[cursor..]
                .find(item.text.as_str())
                .map(|pos| cursor + pos)
                .or_else(|| text.find(item.text.as_str()));

            let span = found.map(|byte_start| {
                let byte_end = byte_start + item.text.len();
                cursor = byte_end;
                let start = text[..byte_start].chars().count();
                Span::new(start, start + item.text.chars().count())
            });

            ExtractionCandidate {
                class: item.class,
                text: item.text,
                span,
                attributes: item.attributes,
                pass_index,
                chunk_index: chunk.index,
                chunk_start: chunk.start,
            }
        })
        .collect()
}
