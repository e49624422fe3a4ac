use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::broker::MessageSource;
use crate::subscriber::rate_meter::RateMeter;

/// Spawns one delivery task per source. Each task feeds `meter` once per
/// inbound message and yields how many it consumed when its source closes.
pub fn spawn_consumers<S>(sources: Vec<S>, meter: &Arc<RateMeter>) -> Vec<JoinHandle<u64>>
where
    S: MessageSource + 'static,
{
    sources
        .into_iter()
        .enumerate()
        .map(|(id, source)| tokio::spawn(consume(id, source, Arc::clone(meter))))
        .collect()
}

async fn consume<S: MessageSource>(id: usize, mut source: S, meter: Arc<RateMeter>) -> u64 {
    let mut consumed = 0;
    while source.recv().await.is_some() {
        meter.on_message();
        consumed += 1;
    }
    debug!("Consumer {id} finished after {consumed} messages");
    consumed
}
