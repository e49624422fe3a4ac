//! Bulk dispatcher
//!
//! Turns "send N messages to D" into batches on a `WorkerPool`. Each batch
//! sends its ordinals in increasing order and stops at the first failed send;
//! other batches keep going. A panicking send is treated like a failed one.
//! Batches may interleave at the broker.
//!
//! `dispatch` returns as soon as every batch is queued. The returned
//! `DispatchHandle` can be awaited for the outcome or dropped, which leaves
//! the batches running in the background. Completion of every batch is also
//! logged and broadcast to `completions()` receivers.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use serde::Deserialize;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, warn};

use crate::broker::MessageSender;
use crate::publisher::batch::{BatchJob, BatchReport, bulk_payload, plan_batches};
use crate::publisher::pool::{WorkerPool, panic_message};
use crate::utils::{RelayError, RelayResult, SendError};

const COMPLETION_BUFFER: usize = 1024;

/// Whether bulk publishing returns after submission or after every batch
/// finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchMode {
    #[default]
    FireAndForget,
    AwaitAll,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub batches: usize,
    pub sent: u64,
}

/// Outcome of one `dispatch` call.
#[derive(Debug)]
#[must_use = "drop the handle explicitly to dispatch fire-and-forget"]
pub struct DispatchHandle {
    pending: Vec<oneshot::Receiver<BatchReport>>,
}

impl DispatchHandle {
    pub fn batches(&self) -> usize {
        self.pending.len()
    }

    /// Waits for every batch. If any batch failed, the failure of the lowest
    /// ordinal is returned after all of them have finished.
    pub async fn wait(self) -> RelayResult<DispatchSummary> {
        let mut summary = DispatchSummary {
            batches: self.pending.len(),
            sent: 0,
        };
        let mut failure = None;

        for (index, reply) in self.pending.into_iter().enumerate() {
            let report = reply.await.map_err(|_| RelayError::BatchLost(index + 1))?;
            summary.sent += report.sent;
            if let Some(source) = report.error {
                failure.get_or_insert(RelayError::BatchFailed {
                    ordinal: report.ordinal,
                    sent: report.sent,
                    source,
                });
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(summary),
        }
    }
}

pub struct BulkDispatcher {
    sender: Arc<dyn MessageSender>,
    pool: WorkerPool,
    batch_size: u64,
    completions: broadcast::Sender<BatchReport>,
}

impl BulkDispatcher {
    pub const DEFAULT_BATCH_SIZE: u64 = 5000;
    pub const DEFAULT_POOL_SIZE: usize = 5;

    /// Must be called from within a tokio runtime; the pool workers are
    /// spawned immediately.
    pub fn new(
        sender: Arc<dyn MessageSender>,
        batch_size: u64,
        pool_size: usize,
    ) -> RelayResult<Self> {
        if batch_size == 0 {
            return Err(RelayError::InvalidConfig(
                "batch_size must be greater than zero".to_string(),
            ));
        }
        let pool = WorkerPool::new(pool_size)?;
        let (completions, _) = broadcast::channel(COMPLETION_BUFFER);

        Ok(Self {
            sender,
            pool,
            batch_size,
            completions,
        })
    }

    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }

    pub fn pool_size(&self) -> usize {
        self.pool.size()
    }

    pub fn completions(&self) -> broadcast::Receiver<BatchReport> {
        self.completions.subscribe()
    }

    pub fn dispatch(&self, destination: &str, total: u64) -> RelayResult<DispatchHandle> {
        let batches = plan_batches(destination, total, self.batch_size)?;
        let mut pending = Vec::with_capacity(batches.len());

        for job in batches {
            let (reply, done) = oneshot::channel();
            let task = run_batch(
                Arc::clone(&self.sender),
                job,
                self.completions.clone(),
                reply,
            );
            self.pool.submit(task.boxed())?;
            pending.push(done);
        }

        debug!(
            "Queued {} batches for {total} messages to {destination}",
            pending.len()
        );
        Ok(DispatchHandle { pending })
    }

    /// Drains queued and running batches, then stops the workers.
    pub async fn shutdown(self) {
        self.pool.shutdown().await;
    }
}

async fn run_batch(
    sender: Arc<dyn MessageSender>,
    job: BatchJob,
    completions: broadcast::Sender<BatchReport>,
    reply: oneshot::Sender<BatchReport>,
) {
    let mut sent = 0;
    let outcome = AssertUnwindSafe(send_range(&*sender, &job, &mut sent))
        .catch_unwind()
        .await;
    let error = match outcome {
        Ok(result) => result.err(),
        Err(panic) => Some(SendError::Panicked(panic_message(&*panic))),
    };

    let report = BatchReport {
        ordinal: job.ordinal,
        start: job.start,
        end: job.end,
        sent,
        error,
        finished_at: Utc::now(),
    };

    match &report.error {
        None => info!("Batch {} sent: {} messages", report.ordinal, report.sent),
        Some(e) => warn!(
            "Batch {} aborted after {} of {} messages: {e}",
            report.ordinal,
            report.sent,
            job.len()
        ),
    }

    // nobody listening is fine for both signals
    let _ = completions.send(report.clone());
    let _ = reply.send(report);
}

/// Sends the batch in index order, stopping at the first failure.
async fn send_range(
    sender: &dyn MessageSender,
    job: &BatchJob,
    sent: &mut u64,
) -> Result<(), SendError> {
    for index in job.range() {
        sender.send(&job.destination, &bulk_payload(index)).await?;
        *sent += 1;
    }
    Ok(())
}
