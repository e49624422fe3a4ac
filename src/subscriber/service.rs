use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::broker::MessageSource;
use crate::config::SubscriberSettings;
use crate::subscriber::consumer::spawn_consumers;
use crate::subscriber::rate_meter::RateMeter;

/// GPS consuming front.
///
/// Queue consumers and topic consumers are attached the same way and all
/// feed the one meter; it cannot tell them apart.
#[derive(Debug, Clone)]
pub struct GpsSubscriber {
    meter: Arc<RateMeter>,
}

impl GpsSubscriber {
    pub fn new(settings: &SubscriberSettings) -> Self {
        Self::with_meter(Arc::new(RateMeter::new(Duration::from_millis(
            settings.window_ms,
        ))))
    }

    pub fn with_meter(meter: Arc<RateMeter>) -> Self {
        Self { meter }
    }

    pub fn meter(&self) -> &Arc<RateMeter> {
        &self.meter
    }

    pub fn attach<S>(&self, sources: Vec<S>) -> Vec<JoinHandle<u64>>
    where
        S: MessageSource + 'static,
    {
        spawn_consumers(sources, &self.meter)
    }

    /// Waits for consumers to finish and returns the total they consumed.
    pub async fn join(handles: Vec<JoinHandle<u64>>) -> u64 {
        let mut total = 0;
        for result in join_all(handles).await {
            match result {
                Ok(consumed) => total += consumed,
                Err(e) => warn!("Consumer task failed: {e}"),
            }
        }
        total
    }
}
