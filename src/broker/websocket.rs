//! WebSocket adapters for the external broker.
//!
//! `WsBrokerClient` is the publishing side: a single connection whose write
//! half is shared by every sender behind a tokio mutex, so frames from
//! concurrent batches never interleave mid-frame. A background task drains
//! the read half and logs anything the broker sends back.
//!
//! `WsSubscription` is one consumer: it subscribes on connect and then yields
//! the payload of every `deliver` frame.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::broker::destination::Destination;
use crate::broker::frame::{ClientFrame, ServerFrame};
use crate::broker::ports::{MessageSender, MessageSource};
use crate::utils::SendError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

fn transport_error(err: tungstenite::Error) -> SendError {
    match err {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            SendError::Closed
        }
        other => SendError::Transport(other.to_string()),
    }
}

async fn open(url: &str) -> Result<WsStream, SendError> {
    let (stream, _response) = connect_async(url)
        .await
        .map_err(|e| SendError::Connect(format!("{url}: {e}")))?;
    Ok(stream)
}

pub struct WsBrokerClient {
    url: String,
    persistent: bool,
    sink: Mutex<SplitSink<WsStream, WsMessage>>,
    reader: JoinHandle<()>,
}

impl WsBrokerClient {
    pub async fn connect(url: &str, persistent: bool) -> Result<Self, SendError> {
        let (sink, stream) = open(url).await?.split();
        let reader = tokio::spawn(drain_server_frames(url.to_string(), stream));
        info!("Connected publisher to broker at {url}");

        Ok(Self {
            url: url.to_string(),
            persistent,
            sink: Mutex::new(sink),
            reader,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for WsBrokerClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[async_trait]
impl MessageSender for WsBrokerClient {
    async fn send(&self, destination: &str, payload: &str) -> Result<(), SendError> {
        let frame = ClientFrame::Publish {
            destination: destination.to_string(),
            payload: payload.to_string(),
            message_id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            persistent: self.persistent,
        };
        let text = serde_json::to_string(&frame)?;

        let mut sink = self.sink.lock().await;
        sink.send(WsMessage::text(text)).await.map_err(transport_error)
    }
}

async fn drain_server_frames(url: String, mut stream: SplitStream<WsStream>) {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => match serde_json::from_str::<ServerFrame>(text.as_str()) {
                Ok(ServerFrame::Error { message }) => {
                    warn!("Broker at {url} rejected a frame: {message}");
                }
                Ok(other) => debug!("Ignoring {other:?} on publishing connection"),
                Err(e) => debug!("Unparseable frame from {url}: {e}"),
            },
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Publishing connection to {url} failed: {e}");
                break;
            }
        }
    }
    debug!("Read loop closed for {url}");
}

pub struct WsSubscription {
    destination: Destination,
    stream: SplitStream<WsStream>,
    // kept so the write half outlives the subscription
    _sink: SplitSink<WsStream, WsMessage>,
}

impl WsSubscription {
    pub async fn connect(url: &str, destination: Destination) -> Result<Self, SendError> {
        let (mut sink, stream) = open(url).await?.split();

        let frame = ClientFrame::Subscribe {
            destination: destination.name.clone(),
            mode: destination.mode,
            subscription: destination.subscription.clone(),
        };
        sink.send(WsMessage::text(serde_json::to_string(&frame)?))
            .await
            .map_err(transport_error)?;
        debug!("Subscribed to {destination} via {url}");

        Ok(Self {
            destination,
            stream,
            _sink: sink,
        })
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }
}

#[async_trait]
impl MessageSource for WsSubscription {
    async fn recv(&mut self) -> Option<String> {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => {
                    match serde_json::from_str::<ServerFrame>(text.as_str()) {
                        Ok(ServerFrame::Deliver { payload, .. }) => return Some(payload),
                        Ok(ServerFrame::Error { message }) => {
                            warn!("Broker error on {}: {message}", self.destination);
                        }
                        Err(e) => debug!("Skipping unparseable frame on {}: {e}", self.destination),
                    }
                }
                Ok(WsMessage::Close(_)) => return None,
                Ok(_) => {}
                Err(e) => {
                    warn!("Subscription to {} failed: {e}", self.destination);
                    return None;
                }
            }
        }
        None
    }
}
