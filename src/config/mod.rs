mod settings;

use config::{Config, Environment, File};

use crate::config::settings::PartialSettings;
use crate::utils::RelayResult;

pub use settings::{
    BrokerSettings, LoggingSettings, PublisherSettings, Settings, SubscriberSettings,
};

/// Default location of the optional configuration file (any format the
/// `config` crate understands, e.g. `config/default.toml`).
pub const DEFAULT_CONFIG_PATH: &str = "config/default";

/// Prefix for environment overrides, e.g. `GPSRELAY_PUBLISHER__BATCH_SIZE=250`.
pub const ENV_PREFIX: &str = "GPSRELAY";

/// Loads the configuration from the default file, `.env` and the environment.
pub fn load_config() -> RelayResult<Settings> {
    let _ = dotenvy::dotenv();
    load_config_from(DEFAULT_CONFIG_PATH)
}

/// Loads `path` (if present) and environment overrides, merges them over the
/// defaults and validates the result.
pub fn load_config_from(path: &str) -> RelayResult<Settings> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;
    let settings = merge(partial, Settings::default());
    settings.validate()?;
    Ok(settings)
}

fn merge(partial: PartialSettings, default: Settings) -> Settings {
    let broker = partial.broker.unwrap_or_default();
    let publisher = partial.publisher.unwrap_or_default();
    let subscriber = partial.subscriber.unwrap_or_default();
    let logging = partial.logging.unwrap_or_default();

    Settings {
        broker: BrokerSettings {
            url: broker.url.unwrap_or(default.broker.url),
            persistent: broker.persistent.unwrap_or(default.broker.persistent),
        },
        publisher: PublisherSettings {
            queue: publisher.queue.unwrap_or(default.publisher.queue),
            batch_size: publisher
                .batch_size
                .unwrap_or(default.publisher.batch_size),
            pool_size: publisher.pool_size.unwrap_or(default.publisher.pool_size),
            dispatch_mode: publisher
                .dispatch_mode
                .unwrap_or(default.publisher.dispatch_mode),
            bulk_count: publisher
                .bulk_count
                .unwrap_or(default.publisher.bulk_count),
        },
        subscriber: SubscriberSettings {
            queue: subscriber.queue.unwrap_or(default.subscriber.queue),
            topic: subscriber.topic.unwrap_or(default.subscriber.topic),
            subscription: subscriber
                .subscription
                .unwrap_or(default.subscriber.subscription),
            concurrency: subscriber
                .concurrency
                .unwrap_or(default.subscriber.concurrency),
            window_ms: subscriber.window_ms.unwrap_or(default.subscriber.window_ms),
        },
        logging: LoggingSettings {
            level: logging.level.unwrap_or(default.logging.level),
        },
    }
}
