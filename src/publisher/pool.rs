//! Fixed-size worker pool
//!
//! Tasks go into an unbounded FIFO queue and are pulled by `size` worker
//! tasks, so at most `size` tasks run at once and the rest start in
//! submission order as workers free up. Submitting never waits.
//!
//! Workers take turns on the queue: the idle worker holding the receiver lock
//! is the one that gets the next task, which keeps start order FIFO.
//!
//! A task that panics is logged and dropped; its worker keeps serving the
//! queue.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::utils::{RelayError, RelayResult};

pub type Task = BoxFuture<'static, ()>;

#[derive(Debug)]
pub struct WorkerPool {
    queue: mpsc::UnboundedSender<Task>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `size` workers on the current tokio runtime.
    pub fn new(size: usize) -> RelayResult<Self> {
        if size == 0 {
            return Err(RelayError::InvalidConfig(
                "pool_size must be greater than zero".to_string(),
            ));
        }

        let (queue, rx) = mpsc::unbounded_channel::<Task>();
        let rx = Arc::new(Mutex::new(rx));
        let workers = (0..size)
            .map(|id| tokio::spawn(run_worker(id, Arc::clone(&rx))))
            .collect();

        Ok(Self { queue, workers })
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn submit(&self, task: Task) -> RelayResult<()> {
        self.queue.send(task).map_err(|_| RelayError::PoolClosed)
    }

    /// Closes the queue and waits until every queued and running task is done.
    pub async fn shutdown(self) {
        let Self { queue, workers } = self;
        drop(queue);

        for result in join_all(workers).await {
            if let Err(e) = result {
                warn!("Worker ended abnormally: {e}");
            }
        }
    }
}

async fn run_worker(id: usize, queue: Arc<Mutex<mpsc::UnboundedReceiver<Task>>>) {
    loop {
        let next = { queue.lock().await.recv().await };
        match next {
            Some(task) => {
                if let Err(panic) = AssertUnwindSafe(task).catch_unwind().await {
                    warn!(
                        "Worker {id} recovered from a panicking task: {}",
                        panic_message(&*panic)
                    );
                }
            }
            None => break,
        }
    }
    debug!("Worker {id} stopped");
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
