use serde::Deserialize;

use crate::broker::{GPS_QUEUE, GPS_SUBSCRIPTION, GPS_TOPIC};
use crate::publisher::{BulkDispatcher, DispatchMode};
use crate::utils::{RelayError, RelayResult};

/// Top-level configuration settings for the relay.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub broker: BrokerSettings,
    pub publisher: PublisherSettings,
    pub subscriber: SubscriberSettings,
    pub logging: LoggingSettings,
}

/// Where the external broker lives and how messages are handed to it.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub url: String,
    /// Ask the broker to keep published messages across restarts.
    pub persistent: bool,
}

/// Bulk publishing parameters.
#[derive(Debug, Deserialize, Clone)]
pub struct PublisherSettings {
    /// Destination of single-message publishes and the default bulk target.
    pub queue: String,
    pub batch_size: u64,
    pub pool_size: usize,
    pub dispatch_mode: DispatchMode,
    /// Bulk count used when the operator does not give one.
    pub bulk_count: u64,
}

/// Consumption and throughput accounting parameters.
#[derive(Debug, Deserialize, Clone)]
pub struct SubscriberSettings {
    pub queue: String,
    pub topic: String,
    /// Durable subscription name used for the topic.
    pub subscription: String,
    /// Number of competing queue consumers.
    pub concurrency: usize,
    pub window_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Default, Deserialize)]
pub struct PartialSettings {
    pub broker: Option<PartialBrokerSettings>,
    pub publisher: Option<PartialPublisherSettings>,
    pub subscriber: Option<PartialSubscriberSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialBrokerSettings {
    pub url: Option<String>,
    pub persistent: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialPublisherSettings {
    pub queue: Option<String>,
    pub batch_size: Option<u64>,
    pub pool_size: Option<usize>,
    pub dispatch_mode: Option<DispatchMode>,
    pub bulk_count: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialSubscriberSettings {
    pub queue: Option<String>,
    pub topic: Option<String>,
    pub subscription: Option<String>,
    pub concurrency: Option<usize>,
    pub window_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            broker: BrokerSettings {
                url: "ws://127.0.0.1:8080".to_string(),
                persistent: true,
            },
            publisher: PublisherSettings {
                queue: GPS_QUEUE.to_string(),
                batch_size: BulkDispatcher::DEFAULT_BATCH_SIZE,
                pool_size: BulkDispatcher::DEFAULT_POOL_SIZE,
                dispatch_mode: DispatchMode::FireAndForget,
                bulk_count: 100_000,
            },
            subscriber: SubscriberSettings {
                queue: GPS_QUEUE.to_string(),
                topic: GPS_TOPIC.to_string(),
                subscription: GPS_SUBSCRIPTION.to_string(),
                concurrency: 50,
                window_ms: 5000,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl Settings {
    /// Rejects values that would make dispatch or metering meaningless.
    pub fn validate(&self) -> RelayResult<()> {
        let checks = [
            (self.publisher.batch_size == 0, "publisher.batch_size"),
            (self.publisher.pool_size == 0, "publisher.pool_size"),
            (self.subscriber.concurrency == 0, "subscriber.concurrency"),
            (self.subscriber.window_ms == 0, "subscriber.window_ms"),
        ];

        match checks.iter().find(|(invalid, _)| *invalid) {
            Some((_, key)) => Err(RelayError::InvalidConfig(format!(
                "{key} must be greater than zero"
            ))),
            None => Ok(()),
        }
    }
}
