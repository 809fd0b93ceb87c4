//! Sequential multi-pass scheduling over a fixed chunk set

use crate::error::ExtractorError;
use crate::metrics::PoolCounters;
use crate::types::{ItemFailure, ItemOutcome, PassStatus, PassSummary, WorkItem};
use crate::worker::{CancellationFlag, WorkerPool};
use quarry_domain::{Chunk, ChunkExtractor, ExtractionCandidate, ExtractionTask};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything the passes produced, before aggregation
#[derive(Debug, Clone, Default)]
pub struct ScheduleRun {
    /// Candidates in (pass, chunk, arrival) order
    pub candidates: Vec<ExtractionCandidate>,

    /// One summary per configured pass
    pub passes: Vec<PassSummary>,

    /// Failed work items across all passes
    pub failures: Vec<ItemFailure>,

    /// Counters merged across passes
    pub telemetry: PoolCounters,

    /// Whether cancellation cut the run short
    pub cancelled: bool,
}

/// Runs `passes` independent extraction passes one after another
#[derive(Debug, Clone)]
pub struct PassScheduler {
    pool: WorkerPool,
    passes: usize,
}

impl PassScheduler {
    /// Create a scheduler; `passes` must be at least 1
    pub fn new(pool: WorkerPool, passes: usize) -> Result<Self, ExtractorError> {
        if passes == 0 {
            return Err(ExtractorError::Config(
                "extraction_passes must be at least 1".to_string(),
            ));
        }
        Ok(Self { pool, passes })
    }

    /// Number of configured passes
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Run every pass over `chunks`
    ///
    /// A failed pass does not stop the next one. The run is an error only
    /// when every pass that executed ended as [`PassStatus::Failed`].
    pub async fn run<E>(
        &self,
        extractor: Arc<E>,
        task: Arc<ExtractionTask>,
        chunks: &[Chunk],
        cancel: &CancellationFlag,
    ) -> Result<ScheduleRun, ExtractorError>
    where
        E: ChunkExtractor + ?Sized + 'static,
    {
        let mut run = ScheduleRun::default();

        for pass_index in 0..self.passes {
            if cancel.is_cancelled() {
                debug!(pass = pass_index, "Pass not started, extraction cancelled");
                run.passes.push(PassSummary::not_started(pass_index));
                run.cancelled = true;
                continue;
            }

            let items: Vec<WorkItem> = chunks
                .iter()
                .cloned()
                .map(|chunk| WorkItem { chunk, pass_index })
                .collect();
            let item_count = items.len();

            let pool_run = self
                .pool
                .run(Arc::clone(&extractor), Arc::clone(&task), items, cancel)
                .await?;

            for result in pool_run.results {
                match result.outcome {
                    ItemOutcome::Completed(candidates) => run.candidates.extend(candidates),
                    ItemOutcome::Failed(failure) => run.failures.push(failure),
                    ItemOutcome::Skipped => {}
                }
            }

            let summary = PassSummary::from_counters(pass_index, item_count, &pool_run.counters);
            match summary.status {
                PassStatus::Failed => warn!(pass = pass_index, "Pass failed for every chunk"),
                PassStatus::Incomplete => {
                    warn!(pass = pass_index, "Pass produced nothing, retries exhausted")
                }
                PassStatus::Cancelled => run.cancelled = true,
                _ => {}
            }
            info!(
                pass = pass_index,
                status = %summary.status,
                "Pass finished: {}",
                pool_run.counters.summary()
            );

            run.telemetry.merge(&pool_run.counters);
            run.passes.push(summary);
        }

        let executed: Vec<&PassSummary> = run.passes.iter().filter(|p| p.items > 0).collect();
        if !executed.is_empty() && executed.iter().all(|p| p.status == PassStatus::Failed) {
            let last_error = run
                .failures
                .last()
                .map(|f| f.error.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            return Err(ExtractorError::AllPassesFailed {
                passes: executed.len(),
                last_error,
            });
        }

        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::RetryPolicy;
    use async_trait::async_trait;
    use quarry_domain::{CallError, RawExtraction};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn pool() -> WorkerPool {
        WorkerPool::new(
            2,
            RetryPolicy {
                retry_limit: 0,
                base_delay: Duration::from_millis(1),
                call_timeout: Duration::from_secs(5),
            },
        )
        .unwrap()
    }

    fn chunks() -> Vec<Chunk> {
        vec![
            Chunk {
                index: 0,
                start: 0,
                end: 5,
                text: "alpha".into(),
            },
            Chunk {
                index: 1,
                start: 5,
                end: 9,
                text: "beta".into(),
            },
        ]
    }

    /// Fails every call made during the given pass (calls are counted
    /// per chunk so the pass number is call_index / chunk_count)
    struct FailPass {
        calls: AtomicUsize,
        chunks_per_pass: usize,
        failing_pass: Option<usize>,
    }

    #[async_trait]
    impl ChunkExtractor for FailPass {
        async fn extract_chunk(
            &self,
            text: &str,
            _task: &ExtractionTask,
        ) -> Result<Vec<RawExtraction>, CallError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(call / self.chunks_per_pass) == self.failing_pass {
                return Err(CallError::Permanent("bad output".into()));
            }
            Ok(vec![RawExtraction::new("word", text)])
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl ChunkExtractor for AlwaysFails {
        async fn extract_chunk(
            &self,
            _text: &str,
            _task: &ExtractionTask,
        ) -> Result<Vec<RawExtraction>, CallError> {
            Err(CallError::Permanent("nope".into()))
        }
    }

    fn task() -> Arc<ExtractionTask> {
        Arc::new(ExtractionTask::new("words"))
    }

    #[tokio::test]
    async fn test_candidates_in_pass_then_chunk_order() {
        let scheduler = PassScheduler::new(pool(), 2).unwrap();
        let extractor = Arc::new(FailPass {
            calls: AtomicUsize::new(0),
            chunks_per_pass: 2,
            failing_pass: None,
        });

        let run = scheduler
            .run(extractor, task(), &chunks(), &CancellationFlag::new())
            .await
            .unwrap();

        let order: Vec<_> = run
            .candidates
            .iter()
            .map(|c| (c.pass_index, c.chunk_index))
            .collect();
        assert_eq!(order, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
        assert_eq!(run.passes.len(), 2);
        assert!(run.passes.iter().all(|p| p.status == PassStatus::Completed));
        assert_eq!(run.telemetry.succeeded, 4);
    }

    #[tokio::test]
    async fn test_failed_pass_does_not_stop_siblings() {
        let scheduler = PassScheduler::new(pool(), 3).unwrap();
        let extractor = Arc::new(FailPass {
            calls: AtomicUsize::new(0),
            chunks_per_pass: 2,
            failing_pass: Some(1),
        });

        let run = scheduler
            .run(extractor, task(), &chunks(), &CancellationFlag::new())
            .await
            .unwrap();

        assert_eq!(run.passes[0].status, PassStatus::Completed);
        assert_eq!(run.passes[1].status, PassStatus::Failed);
        assert_eq!(run.passes[2].status, PassStatus::Completed);
        assert_eq!(run.failures.len(), 2);
        assert_eq!(run.candidates.len(), 4);
    }

    #[tokio::test]
    async fn test_every_pass_failed_is_an_error() {
        let scheduler = PassScheduler::new(pool(), 2).unwrap();

        let err = scheduler
            .run(Arc::new(AlwaysFails), task(), &chunks(), &CancellationFlag::new())
            .await
            .unwrap_err();

        match err {
            ExtractorError::AllPassesFailed { passes, last_error } => {
                assert_eq!(passes, 2);
                assert!(last_error.contains("nope"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    struct AlwaysRateLimited;

    #[async_trait]
    impl ChunkExtractor for AlwaysRateLimited {
        async fn extract_chunk(
            &self,
            _text: &str,
            _task: &ExtractionTask,
        ) -> Result<Vec<RawExtraction>, CallError> {
            Err(CallError::Transient("429".into()))
        }
    }

    #[tokio::test]
    async fn test_exhausted_retries_are_not_a_hard_failure() {
        let scheduler = PassScheduler::new(pool(), 2).unwrap();

        let run = scheduler
            .run(Arc::new(AlwaysRateLimited), task(), &chunks(), &CancellationFlag::new())
            .await
            .unwrap();

        assert!(run.candidates.is_empty());
        assert_eq!(run.failures.len(), 4);
        assert!(run.passes.iter().all(|p| p.status == PassStatus::Incomplete));
    }

    #[tokio::test]
    async fn test_cancelled_passes_are_recorded() {
        let scheduler = PassScheduler::new(pool(), 3).unwrap();
        let cancel = CancellationFlag::new();
        cancel.cancel();

        let run = scheduler
            .run(Arc::new(AlwaysFails), task(), &chunks(), &cancel)
            .await
            .unwrap();

        assert!(run.cancelled);
        assert_eq!(run.passes.len(), 3);
        assert!(run.passes.iter().all(|p| p.status == PassStatus::Cancelled));
        assert!(run.candidates.is_empty());
    }

    #[test]
    fn test_zero_passes_rejected() {
        assert!(matches!(
            PassScheduler::new(pool(), 0),
            Err(ExtractorError::Config(_))
        ));
    }
}
