//! Bounded-concurrency dispatch of work items to the extraction capability

use crate::alignment::align_candidates;
use crate::config::PipelineConfig;
use crate::error::ExtractorError;
use crate::metrics::PoolCounters;
use crate::types::{ItemFailure, ItemOutcome, WorkItem};
use quarry_domain::{CallError, ChunkExtractor, ExtractionTask, Span};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Cloneable, document-level cancellation signal
///
/// Once cancelled, the pool dispatches no further work items; calls already
/// in flight run to completion and their results are kept.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    inner: Arc<CancelState>,
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationFlag {
    /// Create a flag that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until cancellation is requested
    pub async fn cancelled(&self) {
        loop {
            // registered before the check so a concurrent cancel() is not missed
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Retry and timeout settings applied to every call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after a transient failure
    pub retry_limit: usize,

    /// Backoff before the first retry; doubles for each further retry
    pub base_delay: Duration,

    /// Maximum duration of a single call
    pub call_timeout: Duration,
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (zero based)
    pub fn delay(&self, attempt: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt as u32).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

impl From<&PipelineConfig> for RetryPolicy {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            retry_limit: config.retry_limit,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            call_timeout: config.call_timeout(),
        }
    }
}

/// Result of one work item, in the position of the item that produced it
#[derive(Debug, Clone)]
pub struct ItemResult {
    /// Pass of the item
    pub pass_index: usize,

    /// Chunk of the item
    pub chunk_index: usize,

    /// What happened
    pub outcome: ItemOutcome,
}

/// Everything a pool run produced
#[derive(Debug, Clone)]
pub struct PoolRun {
    /// One result per input item, in input order
    pub results: Vec<ItemResult>,

    /// Counters merged from every item
    pub counters: PoolCounters,
}

/// Dispatches work items with at most `max_workers` calls in flight
#[derive(Debug, Clone)]
pub struct WorkerPool {
    max_workers: usize,
    policy: RetryPolicy,
}

impl WorkerPool {
    /// Create a pool; `max_workers` must be at least 1
    pub fn new(max_workers: usize, policy: RetryPolicy) -> Result<Self, ExtractorError> {
        if max_workers == 0 {
            return Err(ExtractorError::Config(
                "max_workers must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            max_workers,
            policy,
        })
    }

    /// Create a pool from pipeline configuration
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ExtractorError> {
        Self::new(config.max_workers, RetryPolicy::from(config))
    }

    /// Run every item through `extractor`
    ///
    /// Results land in a fixed slot per item, so completion order does not
    /// matter. An item failure never aborts its siblings; only a panicking
    /// worker task turns into an error.
    pub async fn run<E>(
        &self,
        extractor: Arc<E>,
        task: Arc<ExtractionTask>,
        items: Vec<WorkItem>,
        cancel: &CancellationFlag,
    ) -> Result<PoolRun, ExtractorError>
    where
        E: ChunkExtractor + ?Sized + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut slots: Vec<Option<ItemResult>> = vec![None; items.len()];
        let mut counters = PoolCounters::new();
        let mut workers = JoinSet::new();

        debug!(items = items.len(), max_workers = self.max_workers, "Dispatching work items");

        for (position, item) in items.into_iter().enumerate() {
            let permit = if cancel.is_cancelled() {
                None
            } else {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    permit = Arc::clone(&semaphore).acquire_owned() => {
                        Some(permit.map_err(|e| ExtractorError::Worker(e.to_string()))?)
                    }
                }
            };

            let Some(permit) = permit else {
                counters.record_skip();
                slots[position] = Some(ItemResult {
                    pass_index: item.pass_index,
                    chunk_index: item.chunk.index,
                    outcome: ItemOutcome::Skipped,
                });
                continue;
            };

            let extractor = Arc::clone(&extractor);
            let task = Arc::clone(&task);
            let policy = self.policy;
            let cancel = cancel.clone();

            workers.spawn(async move {
                let _permit = permit;
                let (outcome, item_counters) =
                    process_item(extractor.as_ref(), &task, &item, &policy, &cancel).await;
                let result = ItemResult {
                    pass_index: item.pass_index,
                    chunk_index: item.chunk.index,
                    outcome,
                };
                (position, result, item_counters)
            });
        }

        while let Some(joined) = workers.join_next().await {
            let (position, result, item_counters) =
                joined.map_err(|e| ExtractorError::Worker(e.to_string()))?;
            counters.merge(&item_counters);
            slots[position] = Some(result);
        }

        debug!("Pool run finished: {}", counters.summary());

        Ok(PoolRun {
            results: slots.into_iter().flatten().collect(),
            counters,
        })
    }
}

/// Call the extractor for one item, retrying transient failures
async fn process_item<E>(
    extractor: &E,
    task: &ExtractionTask,
    item: &WorkItem,
    policy: &RetryPolicy,
    cancel: &CancellationFlag,
) -> (ItemOutcome, PoolCounters)
where
    E: ChunkExtractor + ?Sized,
{
    let mut counters = PoolCounters::new();
    let mut attempt = 0;

    loop {
        counters.record_dispatch();

        let result = match timeout(policy.call_timeout, extractor.extract_chunk(&item.chunk.text, task)).await {
            Ok(result) => result,
            Err(_) => Err(CallError::Transient(format!(
                "call timed out after {:?}",
                policy.call_timeout
            ))),
        };

        let error = match result {
            Ok(raw) => {
                let candidates = align_candidates(&item.chunk, item.pass_index, raw);
                counters.record_success(candidates.len());
                return (ItemOutcome::Completed(candidates), counters);
            }
            Err(error) => error,
        };

        counters.record_call_error(error.is_transient());

        if error.is_transient() && attempt < policy.retry_limit && !cancel.is_cancelled() {
            let delay = policy.delay(attempt);
            debug!(
                pass = item.pass_index,
                chunk = item.chunk.index,
                attempt = attempt + 1,
                "Transient failure, retrying in {:?}: {}",
                delay,
                error
            );
            counters.record_retry();
            sleep(delay).await;
            attempt += 1;
            continue;
        }

        warn!(
            pass = item.pass_index,
            chunk = item.chunk.index,
            attempts = attempt + 1,
            "Work item failed: {}",
            error
        );
        counters.record_failure(error.is_transient());

        let failure = ItemFailure {
            pass_index: item.pass_index,
            chunk_index: item.chunk.index,
            chunk_span: Span::new(item.chunk.start, item.chunk.end),
            attempts: attempt + 1,
            error,
        };
        return (ItemOutcome::Failed(failure), counters);
    }
}
