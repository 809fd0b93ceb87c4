//! Documents - the immutable source of every offset

use std::fmt;

/// Stable identifier for a Document
///
/// Callers usually supply their own identifier (a file name, a URL, a record
/// key). When they do not, [`DocumentId::generate`] produces a UUIDv7-based
/// one, which sorts chronologically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    /// Wrap a caller-supplied identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identifier of the form `doc_<uuidv7>`
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry_domain::DocumentId;
    ///
    /// let id = DocumentId::generate();
    /// assert!(id.as_str().starts_with("doc_"));
    /// ```
    pub fn generate() -> Self {
        Self(format!("doc_{}", uuid::Uuid::now_v7().simple()))
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for DocumentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An immutable text with a stable identifier
///
/// Offsets are counted in characters (Unicode scalar values), not bytes, so
/// that a chunk boundary can never split a multi-byte character. The byte
/// position of every character boundary is computed once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    id: DocumentId,
    text: String,
    // byte offset of each char boundary, with text.len() as the final entry
    boundaries: Vec<usize>,
}

impl Document {
    /// Create a document with an explicit identifier
    pub fn new(id: impl Into<DocumentId>, text: impl Into<String>) -> Self {
        let text = text.into();
        let boundaries = text
            .char_indices()
            .map(|(byte, _)| byte)
            .chain(std::iter::once(text.len()))
            .collect();

        Self {
            id: id.into(),
            text,
            boundaries,
        }
    }

    /// Create a document with a generated identifier
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(DocumentId::generate(), text)
    }

    /// The document identifier
    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    /// The full text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// Whether the document has no text at all
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Text between two character offsets, `None` when the range is invalid
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry_domain::Document;
    ///
    /// let doc = Document::new("d1", "naïve café");
    /// assert_eq!(doc.slice(6, 10), Some("café"));
    /// assert_eq!(doc.slice(6, 11), None);
    /// ```
    pub fn slice(&self, start: usize, end: usize) -> Option<&str> {
        if start > end || end > self.char_len() {
            return None;
        }
        Some(&self.text[self.boundaries[start]..self.boundaries[end]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_len_counts_characters() {
        let doc = Document::new("d", "héllo");
        assert_eq!(doc.char_len(), 5);
        assert_eq!(doc.text().len(), 6);
    }

    #[test]
    fn test_empty_document() {
        let doc = Document::new("d", "");
        assert!(doc.is_empty());
        assert_eq!(doc.char_len(), 0);
        assert_eq!(doc.slice(0, 0), Some(""));
    }

    #[test]
    fn test_slice_bounds() {
        let doc = Document::new("d", "abcdef");
        assert_eq!(doc.slice(0, 3), Some("abc"));
        assert_eq!(doc.slice(3, 6), Some("def"));
        assert_eq!(doc.slice(4, 3), None);
        assert_eq!(doc.slice(0, 7), None);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = DocumentId::generate();
        let b = DocumentId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_document_id_display() {
        let doc = Document::new("report-7", "text");
        assert_eq!(doc.id().to_string(), "report-7");
    }
}
