use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::utils::SendError;

/// The broker's send primitive.
///
/// Implementations must be shareable across worker tasks; the dispatcher calls
/// `send` concurrently from every running batch.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, destination: &str, payload: &str) -> Result<(), SendError>;
}

/// The broker's receive primitive: a stream of inbound payloads for one
/// consumer. `None` means the source is closed for good.
#[async_trait]
pub trait MessageSource: Send {
    async fn recv(&mut self) -> Option<String>;
}

#[async_trait]
impl MessageSource for mpsc::UnboundedReceiver<String> {
    async fn recv(&mut self) -> Option<String> {
        mpsc::UnboundedReceiver::recv(self).await
    }
}
