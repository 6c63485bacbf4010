//! Chunked, concurrency-bounded batch dispatch.

use crate::chunk::chunk;
use crate::config::DispatchConfig;
use crate::error::BatchError;
use crate::retry::ItemOutcome;
use futures::future::join_all;
use geobatch_abstraction::LocationError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error};

/// Fans a collection of records out to concurrent per-item calls.
///
/// Records are chunked, every chunk is issued at once, and each per-item
/// call holds a semaphore permit for its whole lifetime (retries included),
/// so the permit ceiling is the only cross-chunk throttle. Each chunk is a
/// join point: its results are finalized only once all of its items settle.
pub struct BatchDispatcher {
    /// Maximum records per chunk.
    chunk_size: usize,
    /// Limits concurrently in-flight per-item calls across all chunks.
    semaphore: Arc<Semaphore>,
}

impl BatchDispatcher {
    /// Create a dispatcher with an explicit chunk size and in-flight ceiling.
    #[must_use]
    pub fn new(chunk_size: usize, max_in_flight: usize) -> Self {
        Self { chunk_size, semaphore: Arc::new(Semaphore::new(max_in_flight)) }
    }

    /// Create a dispatcher for search operations from a [`DispatchConfig`].
    #[must_use]
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(config.chunk_size, config.max_in_flight)
    }

    /// Dispatch `records`, invoking `call` once per record.
    ///
    /// Absent outcomes are filtered out; the remaining results are
    /// concatenated in chunk order. Results from an earlier chunk always
    /// precede results from a later one; ordering within a chunk follows
    /// the concurrent completion of its items and is not guaranteed.
    ///
    /// # Errors
    /// Returns [`BatchError::InvalidChunkSize`] when the configured chunk
    /// size is zero; per-item faults never surface here.
    pub async fn dispatch<T, R, F, Fut>(
        &self,
        records: Vec<T>,
        call: F,
    ) -> Result<Vec<R>, BatchError>
    where
        F: Fn(T) -> Fut + Clone,
        Fut: Future<Output = ItemOutcome<R>>,
    {
        let total = records.len();
        let chunks = chunk(records, self.chunk_size)?;

        debug!(
            records = total,
            chunks = chunks.len(),
            chunk_size = self.chunk_size,
            "Dispatching batch"
        );

        let chunk_futures = chunks.into_iter().map(|chunk_records| {
            let call = call.clone();
            async move {
                let item_futures = chunk_records.into_iter().map(|record| {
                    let call = call.clone();
                    async move {
                        let _permit = match self.semaphore.acquire().await {
                            Ok(permit) => permit,
                            Err(err) => {
                                error!(error = %err, "Concurrency limiter closed; dropping record");
                                return ItemOutcome::Failed(LocationError::RequestError(
                                    "concurrency limiter closed".to_string(),
                                ));
                            }
                        };
                        call(record).await
                    }
                });
                join_all(item_futures).await
            }
        });

        let settled = join_all(chunk_futures).await;

        let mut resolved = Vec::with_capacity(total);
        for chunk_outcomes in settled {
            resolved.extend(chunk_outcomes.into_iter().filter_map(ItemOutcome::into_option));
        }

        debug!(records = total, resolved = resolved.len(), "Batch settled");

        Ok(resolved)
    }
}
