//! CLI for gpsrelay
//!
//! Subcommands:
//! - `publish`: send one GPS payload to the GPS queue
//! - `publish-bulk`: send generated messages in batches on the worker pool
//! - `subscribe`: consume from the broker and log throughput
//! - `loopback`: publish and consume in-process, without a broker

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use gpsrelay::broker::{Destination, MemoryBroker, WsBrokerClient, WsSubscription};
use gpsrelay::config::{Settings, load_config};
use gpsrelay::publisher::{DispatchMode, GpsPublisher};
use gpsrelay::subscriber::{GpsSubscriber, RateObservation};
use gpsrelay::utils::{RelayResult, logging};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "gpsrelay")]
enum Command {
    /// Publish a single GPS payload to the GPS queue
    Publish {
        /// Raw payload, sent as-is
        payload: String,
    },
    /// Publish generated messages in batches
    PublishBulk {
        /// Number of messages (default: publisher.bulk_count)
        #[arg(long, allow_negative_numbers = true)]
        count: Option<i64>,
        /// Target destination (default: publisher.queue)
        #[arg(long)]
        destination: Option<String>,
        /// Wait for every batch and fail if any batch failed
        #[arg(long)]
        wait: bool,
    },
    /// Consume GPS messages and log throughput until interrupted
    Subscribe {
        #[arg(long, value_enum, default_value_t = Mode::Both)]
        mode: Mode,
    },
    /// Publish and consume through an in-process broker
    Loopback {
        /// Number of messages (default: publisher.bulk_count)
        #[arg(long, allow_negative_numbers = true)]
        count: Option<i64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Queue,
    Topic,
    Both,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cmd = Command::parse();

    let settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(&settings.logging.level);

    let result = match cmd {
        Command::Publish { payload } => publish(&settings, &payload).await,
        Command::PublishBulk {
            count,
            destination,
            wait,
        } => publish_bulk(&settings, count, destination, wait).await,
        Command::Subscribe { mode } => subscribe(&settings, mode).await,
        Command::Loopback { count } => loopback(&settings, count).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn default_count(settings: &Settings) -> i64 {
    i64::try_from(settings.publisher.bulk_count).unwrap_or(i64::MAX)
}

async fn connect_publisher(settings: &Settings) -> RelayResult<GpsPublisher> {
    let client = WsBrokerClient::connect(&settings.broker.url, settings.broker.persistent).await?;
    GpsPublisher::new(Arc::new(client), &settings.publisher)
}

async fn publish(settings: &Settings, payload: &str) -> RelayResult<()> {
    let publisher = connect_publisher(settings).await?;
    let result = publisher.publish_gps(payload).await;
    publisher.shutdown().await;
    result?;

    println!("GPS data published: {payload}");
    Ok(())
}

async fn publish_bulk(
    settings: &Settings,
    count: Option<i64>,
    destination: Option<String>,
    wait: bool,
) -> RelayResult<()> {
    let count = count.unwrap_or_else(|| default_count(settings));
    let destination = destination.unwrap_or_else(|| settings.publisher.queue.clone());

    let mut publisher = connect_publisher(settings).await?;
    if wait {
        publisher = publisher.with_mode(DispatchMode::AwaitAll);
    }

    let outcome = publisher.send_bulk_messages(&destination, count).await;
    // fire-and-forget batches still have to finish before the process exits
    publisher.shutdown().await;
    let outcome = outcome?;

    println!(
        "Published {count} messages to {destination} in {} batches",
        outcome.batches()
    );
    Ok(())
}

async fn subscribe(settings: &Settings, mode: Mode) -> RelayResult<()> {
    let url = &settings.broker.url;
    let subscriber = GpsSubscriber::new(&settings.subscriber);
    let mut sources = Vec::new();

    if matches!(mode, Mode::Queue | Mode::Both) {
        let queue = Destination::queue(settings.subscriber.queue.clone());
        for _ in 0..settings.subscriber.concurrency {
            sources.push(WsSubscription::connect(url, queue.clone()).await?);
        }
    }
    if matches!(mode, Mode::Topic | Mode::Both) {
        let topic = Destination::topic(
            settings.subscriber.topic.clone(),
            settings.subscriber.subscription.clone(),
        );
        sources.push(WsSubscription::connect(url, topic).await?);
    }

    let handles = subscriber.attach(sources);
    info!("Listening on {url} with {} consumers", handles.len());

    tokio::select! {
        consumed = GpsSubscriber::join(handles) => {
            info!("All consumers closed after {consumed} messages");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }
    Ok(())
}

async fn loopback(settings: &Settings, count: Option<i64>) -> RelayResult<()> {
    let count = count.unwrap_or_else(|| default_count(settings));
    let broker = Arc::new(MemoryBroker::new());
    let subscriber = GpsSubscriber::new(&settings.subscriber);

    let queue = Destination::queue(settings.publisher.queue.clone());
    let receivers: Vec<_> = (0..settings.subscriber.concurrency)
        .map(|_| broker.subscribe(&queue))
        .collect();
    let handles = subscriber.attach(receivers);

    let publisher =
        GpsPublisher::new(broker.clone(), &settings.publisher)?.with_mode(DispatchMode::AwaitAll);
    let started = Instant::now();
    let outcome = publisher.send_bulk_messages(&queue.name, count).await;
    publisher.shutdown().await;
    broker.close();

    let consumed = GpsSubscriber::join(handles).await;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let outcome = outcome?;

    let overall = RateObservation::new(consumed, elapsed_ms);
    println!(
        "Loopback: published {} messages in {} batches, consumed {} ({:.2} msgs/sec)",
        count,
        outcome.batches(),
        overall.consumed,
        overall.rate
    );
    Ok(())
}
