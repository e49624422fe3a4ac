use std::sync::Arc;

use tokio::sync::broadcast;

use crate::broker::MessageSender;
use crate::config::PublisherSettings;
use crate::publisher::batch::BatchReport;
use crate::publisher::dispatcher::{BulkDispatcher, DispatchMode, DispatchSummary};
use crate::utils::{RelayError, RelayResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOutcome {
    /// Batches were queued; they finish in the background.
    Submitted { batches: usize },
    Completed(DispatchSummary),
}

impl BulkOutcome {
    pub fn batches(&self) -> usize {
        match self {
            BulkOutcome::Submitted { batches } => *batches,
            BulkOutcome::Completed(summary) => summary.batches,
        }
    }
}

/// GPS publishing front: one-off publishes and bulk runs share a sender.
pub struct GpsPublisher {
    sender: Arc<dyn MessageSender>,
    dispatcher: BulkDispatcher,
    queue: String,
    mode: DispatchMode,
}

impl GpsPublisher {
    pub fn new(sender: Arc<dyn MessageSender>, settings: &PublisherSettings) -> RelayResult<Self> {
        let dispatcher =
            BulkDispatcher::new(Arc::clone(&sender), settings.batch_size, settings.pool_size)?;
        Ok(Self {
            sender,
            dispatcher,
            queue: settings.queue.clone(),
            mode: settings.dispatch_mode,
        })
    }

    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub fn dispatcher(&self) -> &BulkDispatcher {
        &self.dispatcher
    }

    pub fn completions(&self) -> broadcast::Receiver<BatchReport> {
        self.dispatcher.completions()
    }

    /// Sends a single payload straight to the GPS queue. No batching, no pool.
    pub async fn publish_gps(&self, payload: &str) -> RelayResult<()> {
        self.sender.send(&self.queue, payload).await?;
        Ok(())
    }

    pub async fn send_bulk_messages(&self, destination: &str, count: i64) -> RelayResult<BulkOutcome> {
        let total = u64::try_from(count).map_err(|_| RelayError::NegativeCount(count))?;
        let handle = self.dispatcher.dispatch(destination, total)?;

        match self.mode {
            DispatchMode::FireAndForget => Ok(BulkOutcome::Submitted {
                batches: handle.batches(),
            }),
            DispatchMode::AwaitAll => Ok(BulkOutcome::Completed(handle.wait().await?)),
        }
    }

    /// Waits for every queued batch before releasing the pool.
    pub async fn shutdown(self) {
        self.dispatcher.shutdown().await;
    }
}
