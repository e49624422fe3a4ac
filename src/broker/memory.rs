//! In-process broker.
//!
//! Stands in for the external broker when publisher and subscriber run in the
//! same process (the `loopback` command and the tests). Routing follows the
//! mode of the destination as it was first subscribed:
//! - queue: each message goes to one receiver, round-robin across competitors
//! - topic: each message goes to every receiver
//!
//! Sends to a destination nobody subscribed to are counted and dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::broker::destination::{DeliveryMode, Destination};
use crate::broker::ports::MessageSender;
use crate::utils::SendError;

#[derive(Debug)]
struct Route {
    mode: DeliveryMode,
    receivers: Vec<mpsc::UnboundedSender<String>>,
    cursor: usize,
}

impl Route {
    /// Returns how many receivers got the payload.
    fn deliver(&mut self, payload: &str) -> usize {
        self.receivers.retain(|tx| !tx.is_closed());
        if self.receivers.is_empty() {
            return 0;
        }

        match self.mode {
            DeliveryMode::Queue => {
                let slot = self.cursor % self.receivers.len();
                self.cursor = self.cursor.wrapping_add(1);
                self.receivers
                    .get(slot)
                    .map_or(0, |tx| usize::from(tx.send(payload.to_string()).is_ok()))
            }
            DeliveryMode::Topic => self
                .receivers
                .iter()
                .filter(|tx| tx.send(payload.to_string()).is_ok())
                .count(),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryBroker {
    routes: Mutex<HashMap<String, Route>>,
    closed: AtomicBool,
    accepted: AtomicU64,
    dropped: AtomicU64,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a consumer for `destination` and returns its inbound channel.
    pub fn subscribe(&self, destination: &Destination) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        routes
            .entry(destination.name.clone())
            .or_insert_with(|| Route {
                mode: destination.mode,
                receivers: Vec::new(),
                cursor: 0,
            })
            .receivers
            .push(tx);
        rx
    }

    /// Rejects further sends and ends every receiver once drained.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Messages accepted by `send`.
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Acquire)
    }

    /// Accepted messages that reached no receiver.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Acquire)
    }
}

#[async_trait]
impl MessageSender for MemoryBroker {
    async fn send(&self, destination: &str, payload: &str) -> Result<(), SendError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SendError::Closed);
        }
        self.accepted.fetch_add(1, Ordering::AcqRel);

        let delivered = self
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(destination)
            .map_or(0, |route| route.deliver(payload));

        if delivered == 0 {
            self.dropped.fetch_add(1, Ordering::AcqRel);
            debug!("No consumer for '{destination}', message dropped");
        }
        Ok(())
    }
}
