//! JSON frames exchanged with the broker over WebSocket.
//!
//! Frames are tagged by a `type` field, e.g.
//!
//! ```json
//! {"type":"publish","destination":"gps.telemetry.queue","payload":"Message-0",
//!  "message_id":"…","timestamp":1725000000000,"persistent":true}
//! ```
//!
//! - `publish`: one message for a destination; `persistent` asks the broker to
//!   keep it across restarts
//! - `subscribe`: start receiving from a destination in queue or topic mode
//! - `deliver`: an inbound message for a subscription
//! - `error`: the broker rejected something we sent

use serde::{Deserialize, Serialize};

use crate::broker::destination::DeliveryMode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Publish {
        destination: String,
        payload: String,
        message_id: String,
        timestamp: i64,
        persistent: bool,
    },
    Subscribe {
        destination: String,
        mode: DeliveryMode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subscription: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Deliver {
        destination: String,
        payload: String,
        #[serde(default)]
        message_id: String,
    },
    Error {
        message: String,
    },
}
