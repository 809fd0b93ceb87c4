//! Extraction types, from raw model output to the final ordered set

use crate::document::DocumentId;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Attribute mapping attached to an extraction
///
/// A `BTreeMap` keeps iteration and serialization order deterministic.
pub type Attributes = BTreeMap<String, String>;

/// A half-open `[start, end)` character range
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    /// Inclusive start offset
    pub start: usize,
    /// Exclusive end offset
    pub end: usize,
}

impl Span {
    /// Create a span; `start` must not exceed `end`
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start {} > end {}", start, end);
        Self { start, end }
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the span covers no characters
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shift both ends by `offset`
    pub fn shifted(&self, offset: usize) -> Self {
        Self {
            start: self.start + offset,
            end: self.end + offset,
        }
    }

    /// Number of characters shared with `other`
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry_domain::Span;
    ///
    /// assert_eq!(Span::new(0, 5).overlap(&Span::new(3, 9)), 2);
    /// assert_eq!(Span::new(0, 5).overlap(&Span::new(5, 9)), 0);
    /// ```
    pub fn overlap(&self, other: &Span) -> usize {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        end.saturating_sub(start)
    }
}

/// One item as returned by the extraction capability for a chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawExtraction {
    /// Class label (e.g. "medication")
    pub class: String,

    /// Text the model claims to have found
    pub text: String,

    /// Free-form attributes
    pub attributes: Attributes,
}

impl RawExtraction {
    /// Create a raw extraction without attributes
    pub fn new(class: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            text: text.into(),
            attributes: Attributes::new(),
        }
    }

    /// Add an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// A raw extraction located inside the chunk it came from
///
/// `span` is in chunk-local coordinates and is `None` when the text could
/// not be found in the chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionCandidate {
    /// Class label
    pub class: String,

    /// Extraction text
    pub text: String,

    /// Chunk-local span, if the text was located
    pub span: Option<Span>,

    /// Attributes
    pub attributes: Attributes,

    /// Pass that produced this candidate
    pub pass_index: usize,

    /// Chunk that produced this candidate
    pub chunk_index: usize,

    /// Document offset of the chunk start
    pub chunk_start: usize,
}

impl ExtractionCandidate {
    /// The span in Document coordinates
    pub fn global_span(&self) -> Option<Span> {
        self.span.map(|s| s.shifted(self.chunk_start))
    }
}

/// A deduplicated extraction anchored to Document offsets
///
/// Invariant: `span` lies inside the Document and the Document's text at
/// `span` equals `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Class label
    pub class: String,

    /// Extraction text
    pub text: String,

    /// Document-global span
    pub span: Span,

    /// Attributes, merged across duplicates
    pub attributes: Attributes,

    /// Earliest pass that produced this extraction
    pub pass_index: usize,

    /// Number of candidates merged into this extraction
    pub support: usize,
}

impl Extraction {
    /// Ordering used by [`ExtractionSet`]: start, then end, then class
    pub fn order(&self, other: &Self) -> Ordering {
        self.span
            .start
            .cmp(&other.span.start)
            .then(self.span.end.cmp(&other.span.end))
            .then_with(|| self.class.cmp(&other.class))
    }
}

/// The final ordered extractions for one Document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionSet {
    /// Document the extractions belong to
    pub document_id: DocumentId,

    extractions: Vec<Extraction>,
}

impl ExtractionSet {
    /// Build a set, sorting the extractions into canonical order
    pub fn new(document_id: DocumentId, mut extractions: Vec<Extraction>) -> Self {
        extractions.sort_by(Extraction::order);
        Self {
            document_id,
            extractions,
        }
    }

    /// An empty set; "nothing found" is a valid outcome
    pub fn empty(document_id: DocumentId) -> Self {
        Self {
            document_id,
            extractions: Vec::new(),
        }
    }

    /// Extractions in canonical order
    pub fn extractions(&self) -> &[Extraction] {
        &self.extractions
    }

    /// Iterate over extractions in canonical order
    pub fn iter(&self) -> std::slice::Iter<'_, Extraction> {
        self.extractions.iter()
    }

    /// Number of extractions
    pub fn len(&self) -> usize {
        self.extractions.len()
    }

    /// Whether nothing was extracted
    pub fn is_empty(&self) -> bool {
        self.extractions.is_empty()
    }

    /// Consume the set, returning its extractions
    pub fn into_extractions(self) -> Vec<Extraction> {
        self.extractions
    }
}

impl<'a> IntoIterator for &'a ExtractionSet {
    type Item = &'a Extraction;
    type IntoIter = std::slice::Iter<'a, Extraction>;

    fn into_iter(self) -> Self::IntoIter {
        self.extractions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extraction(class: &str, start: usize, end: usize) -> Extraction {
        Extraction {
            class: class.to_string(),
            text: "x".repeat(end - start),
            span: Span::new(start, end),
            attributes: Attributes::new(),
            pass_index: 0,
            support: 1,
        }
    }

    #[test]
    fn test_span_overlap_disjoint_and_nested() {
        assert_eq!(Span::new(0, 3).overlap(&Span::new(4, 6)), 0);
        assert_eq!(Span::new(0, 10).overlap(&Span::new(2, 4)), 2);
        assert_eq!(Span::new(2, 4).overlap(&Span::new(0, 10)), 2);
    }

    #[test]
    fn test_span_shifted() {
        assert_eq!(Span::new(1, 4).shifted(10), Span::new(11, 14));
    }

    #[test]
    fn test_candidate_global_span() {
        let candidate = ExtractionCandidate {
            class: "dosage".to_string(),
            text: "81mg".to_string(),
            span: Some(Span::new(2, 6)),
            attributes: Attributes::new(),
            pass_index: 0,
            chunk_index: 1,
            chunk_start: 20,
        };
        assert_eq!(candidate.global_span(), Some(Span::new(22, 26)));
    }

    #[test]
    fn test_set_orders_by_start_end_then_class() {
        let set = ExtractionSet::new(
            DocumentId::new("d"),
            vec![
                extraction("b", 5, 9),
                extraction("a", 5, 9),
                extraction("z", 0, 2),
                extraction("a", 5, 7),
            ],
        );

        let order: Vec<_> = set
            .iter()
            .map(|e| (e.span.start, e.span.end, e.class.as_str()))
            .collect();
        assert_eq!(order, vec![(0, 2, "z"), (5, 7, "a"), (5, 9, "a"), (5, 9, "b")]);
    }

    #[test]
    fn test_empty_set() {
        let set = ExtractionSet::empty(DocumentId::new("d"));
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }
}
