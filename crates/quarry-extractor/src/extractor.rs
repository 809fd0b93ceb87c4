//! Core Extractor implementation

use crate::aggregator::Aggregator;
use crate::chunking::TextChunker;
use crate::config::PipelineConfig;
use crate::error::ExtractorError;
use crate::scheduler::PassScheduler;
use crate::types::ExtractionReport;
use crate::worker::{CancellationFlag, WorkerPool};
use quarry_domain::{Chunk, ChunkExtractor, Document, ExtractionTask};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The Extractor turns documents into span-anchored extraction sets
///
/// It chunks the document, runs the configured number of passes through a
/// bounded worker pool and aggregates the candidates into one ordered,
/// deduplicated [`ExtractionSet`](quarry_domain::ExtractionSet).
pub struct Extractor<E>
where
    E: ChunkExtractor + ?Sized + 'static,
{
    capability: Arc<E>,
    config: PipelineConfig,
    chunker: TextChunker,
    scheduler: PassScheduler,
    aggregator: Aggregator,
}

impl<E> Extractor<E>
where
    E: ChunkExtractor + 'static,
{
    /// Create a new Extractor; the configuration is validated here
    pub fn new(capability: E, config: PipelineConfig) -> Result<Self, ExtractorError> {
        Self::from_arc(Arc::new(capability), config)
    }
}

impl<E> Extractor<E>
where
    E: ChunkExtractor + ?Sized + 'static,
{
    /// Create an Extractor around a shared capability
    pub fn from_arc(capability: Arc<E>, config: PipelineConfig) -> Result<Self, ExtractorError> {
        config.validate()?;

        let chunker = TextChunker::new(config.max_char_buffer, config.chunk_overlap)?;
        let pool = WorkerPool::from_config(&config)?;
        let scheduler = PassScheduler::new(pool, config.extraction_passes)?;
        let aggregator = Aggregator::new(config.dedup);

        Ok(Self {
            capability,
            config,
            chunker,
            scheduler,
            aggregator,
        })
    }

    /// The active configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Extract from one document
    pub async fn extract(
        &self,
        document: &Document,
        task: &ExtractionTask,
    ) -> Result<ExtractionReport, ExtractorError> {
        self.extract_with_cancel(document, task, &CancellationFlag::new())
            .await
    }

    /// Extract from one document, stopping dispatch once `cancel` fires
    ///
    /// Cancellation is not an error: the report carries whatever finished
    /// and has `cancelled` set.
    pub async fn extract_with_cancel(
        &self,
        document: &Document,
        task: &ExtractionTask,
        cancel: &CancellationFlag,
    ) -> Result<ExtractionReport, ExtractorError> {
        let start_time = Instant::now();

        let chunks: Vec<Chunk> = self.chunker.chunk(document).collect();

        info!(
            "Starting extraction for document '{}': {} characters, {} chunks, {} passes",
            document.id(),
            document.char_len(),
            chunks.len(),
            self.scheduler.passes()
        );

        let run = self
            .scheduler
            .run(
                Arc::clone(&self.capability),
                Arc::new(task.clone()),
                &chunks,
                cancel,
            )
            .await?;

        debug!("Collected {} candidates", run.candidates.len());

        let aggregation = self.aggregator.aggregate(document, run.candidates);

        if !run.failures.is_empty() {
            warn!(
                "{} of {} work items failed for document '{}'",
                run.failures.len(),
                chunks.len() * self.scheduler.passes(),
                document.id()
            );
        }

        let report = ExtractionReport {
            set: aggregation.set,
            passes: run.passes,
            failures: run.failures,
            anomalies: aggregation.anomalies,
            telemetry: run.telemetry,
            cancelled: run.cancelled,
            processing_time_ms: start_time.elapsed().as_millis() as u64,
        };

        info!("Extraction complete: {} ({}ms)", report.summary(), report.processing_time_ms);

        Ok(report)
    }

    /// Extract from several documents, one after another
    ///
    /// Stops at the first document that fails outright.
    pub async fn extract_all(
        &self,
        documents: &[Document],
        task: &ExtractionTask,
    ) -> Result<Vec<ExtractionReport>, ExtractorError> {
        let mut reports = Vec::with_capacity(documents.len());
        for document in documents {
            reports.push(self.extract(document, task).await?);
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelExtractor;
    use quarry_domain::{CallError, RawExtraction};
    use quarry_llm::MockProvider;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl ChunkExtractor for Echo {
        async fn extract_chunk(
            &self,
            text: &str,
            _task: &ExtractionTask,
        ) -> Result<Vec<RawExtraction>, CallError> {
            Ok(text
                .split_whitespace()
                .filter(|w| w.starts_with(char::is_uppercase))
                .map(|w| RawExtraction::new("name", w))
                .collect())
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PipelineConfig {
            chunk_overlap: 1000,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            Extractor::new(Echo, config),
            Err(ExtractorError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_extract_with_model_extractor() {
        let provider = MockProvider::new("[]");
        provider.add_response(
            "Aspirin",
            r#"[{"extraction_class": "medication", "extraction_text": "Aspirin"}]"#,
        );
        let extractor = Extractor::new(
            ModelExtractor::new(provider.clone()),
            PipelineConfig::default(),
        )
        .unwrap();

        let document = Document::new("doc_1", "Patient takes Aspirin 81mg once daily by mouth.");
        let report = extractor
            .extract(&document, &ExtractionTask::new("Extract medications."))
            .await
            .unwrap();

        assert_eq!(report.set.len(), 1);
        assert_eq!(report.set.extractions()[0].span.start, 14);
        assert_eq!(provider.call_count(), 1);
        assert!(!report.is_partial());
    }

    #[tokio::test]
    async fn test_extract_all_keeps_document_order() {
        let extractor = Extractor::new(Echo, PipelineConfig::default()).unwrap();
        let documents = vec![
            Document::new("a", "Alice met Bob."),
            Document::new("b", "nobody here"),
        ];

        let reports = extractor
            .extract_all(&documents, &ExtractionTask::default())
            .await
            .unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].set.document_id.as_str(), "a");
        assert_eq!(reports[0].set.len(), 2);
        assert!(reports[1].set.is_empty());
    }

    #[tokio::test]
    async fn test_trait_object_capability() {
        let capability: Arc<dyn ChunkExtractor> = Arc::new(Echo);
        let extractor = Extractor::from_arc(capability, PipelineConfig::default()).unwrap();

        let report = extractor
            .extract(&Document::from_text("Hello World"), &ExtractionTask::default())
            .await
            .unwrap();

        assert_eq!(report.set.len(), 2);
    }
}
