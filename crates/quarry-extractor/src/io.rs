//! JSON Lines persistence of extraction sets
//!
//! Each line is one annotated document:
//!
//! ```text
//! {"document_id":"doc_1","extractions":[{"extraction_class":"medication","extraction_text":"Aspirin","start_offset":14,"end_offset":21,"attributes":{}}]}
//! ```

use crate::error::ExtractorError;
use quarry_domain::{Attributes, DocumentId, Extraction, ExtractionSet, Span};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

/// Persisted form of one extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    /// Class label
    pub extraction_class: String,

    /// Extraction text
    pub extraction_text: String,

    /// Character offset of the first character
    pub start_offset: usize,

    /// Character offset one past the last character
    pub end_offset: usize,

    /// Attributes
    #[serde(default)]
    pub attributes: Attributes,
}

impl From<&Extraction> for ExtractionRecord {
    fn from(e: &Extraction) -> Self {
        Self {
            extraction_class: e.class.clone(),
            extraction_text: e.text.clone(),
            start_offset: e.span.start,
            end_offset: e.span.end,
            attributes: e.attributes.clone(),
        }
    }
}

/// One JSONL line: a document id and its extractions in canonical order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedDocument {
    /// Document identifier
    pub document_id: String,

    /// Extractions in canonical order
    pub extractions: Vec<ExtractionRecord>,
}

impl From<&ExtractionSet> for AnnotatedDocument {
    fn from(set: &ExtractionSet) -> Self {
        Self {
            document_id: set.document_id.as_str().to_string(),
            extractions: set.iter().map(ExtractionRecord::from).collect(),
        }
    }
}

impl AnnotatedDocument {
    /// Rebuild an [`ExtractionSet`]
    ///
    /// Pass index and support are not persisted; they come back as `0`
    /// and `1`.
    pub fn into_set(self) -> ExtractionSet {
        let extractions = self
            .extractions
            .into_iter()
            .map(|r| Extraction {
                class: r.extraction_class,
                text: r.extraction_text,
                span: Span::new(r.start_offset, r.end_offset.max(r.start_offset)),
                attributes: r.attributes,
                pass_index: 0,
                support: 1,
            })
            .collect();
        ExtractionSet::new(DocumentId::new(self.document_id), extractions)
    }
}

/// Write one line per set
pub fn write_jsonl<'a, W, I>(writer: W, sets: I) -> Result<usize, ExtractorError>
where
    W: Write,
    I: IntoIterator<Item = &'a ExtractionSet>,
{
    let mut writer = BufWriter::new(writer);
    let mut count = 0;
    for set in sets {
        let line = serde_json::to_string(&AnnotatedDocument::from(set))?;
        writeln!(writer, "{}", line)?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

/// Read annotated documents, skipping blank lines
pub fn read_jsonl<R: Read>(reader: R) -> Result<Vec<AnnotatedDocument>, ExtractorError> {
    let mut documents = Vec::new();
    for line in BufReader::new(reader).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        documents.push(serde_json::from_str(&line)?);
    }
    Ok(documents)
}

/// Write sets to `path`, replacing any existing file
pub fn save_jsonl<'a, I>(path: impl AsRef<Path>, sets: I) -> Result<usize, ExtractorError>
where
    I: IntoIterator<Item = &'a ExtractionSet>,
{
    let path = path.as_ref();
    let count = write_jsonl(File::create(path)?, sets)?;
    debug!("Saved {} annotated documents to {}", count, path.display());
    Ok(count)
}

/// Read annotated documents from `path`
pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Vec<AnnotatedDocument>, ExtractorError> {
    read_jsonl(File::open(path)?)
}
