//! Named targets on the external broker.
//!
//! A destination is either a queue (point-to-point, competing consumers share
//! the load) or a topic (broadcast, every durable subscriber sees every
//! message). Publishers only need the name; subscribers also state the mode
//! and, for topics, the durable subscription name.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const GPS_QUEUE: &str = "gps.telemetry.queue";
pub const GPS_TOPIC: &str = "gps.telemetry.topic";
pub const GPS_SUBSCRIPTION: &str = "GpsDurableSub";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    Queue,
    Topic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub name: String,
    pub mode: DeliveryMode,
    pub subscription: Option<String>,
}

impl Destination {
    pub fn queue(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: DeliveryMode::Queue,
            subscription: None,
        }
    }

    /// A topic destination consumed through a durable subscription.
    pub fn topic(name: impl Into<String>, subscription: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: DeliveryMode::Topic,
            subscription: Some(subscription.into()),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            DeliveryMode::Queue => write!(f, "queue://{}", self.name),
            DeliveryMode::Topic => write!(f, "topic://{}", self.name),
        }
    }
}
