//! Adapters for the external message broker.
//!
//! The relay never routes or stores messages itself. Publishing goes through
//! a `MessageSender`, consumption through a `MessageSource`; the WebSocket
//! adapters talk to a real broker process and `MemoryBroker` keeps everything
//! in-process.

pub mod destination;
pub mod frame;
pub mod memory;
pub mod ports;
pub mod websocket;

pub use destination::{DeliveryMode, Destination, GPS_QUEUE, GPS_SUBSCRIPTION, GPS_TOPIC};
pub use memory::MemoryBroker;
pub use ports::{MessageSender, MessageSource};
pub use websocket::{WsBrokerClient, WsSubscription};
