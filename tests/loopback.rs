use std::sync::Arc;

use gpsrelay::broker::{Destination, GPS_QUEUE, GPS_SUBSCRIPTION, GPS_TOPIC, MemoryBroker};
use gpsrelay::config::Settings;
use gpsrelay::publisher::{BulkOutcome, DispatchMode, GpsPublisher};
use gpsrelay::subscriber::GpsSubscriber;

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.publisher.batch_size = 500;
    settings.publisher.pool_size = 3;
    settings.publisher.dispatch_mode = DispatchMode::AwaitAll;
    // keep every delivery in the open window
    settings.subscriber.window_ms = 600_000;
    settings
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn bulk_publish_reaches_competing_queue_consumers() {
    let settings = settings();
    let broker = Arc::new(MemoryBroker::new());
    let subscriber = GpsSubscriber::new(&settings.subscriber);

    let queue = Destination::queue(GPS_QUEUE);
    let receivers: Vec<_> = (0..4).map(|_| broker.subscribe(&queue)).collect();
    let handles = subscriber.attach(receivers);

    let publisher = GpsPublisher::new(broker.clone(), &settings.publisher).unwrap();
    let outcome = publisher.send_bulk_messages(GPS_QUEUE, 2_250).await.unwrap();
    match outcome {
        BulkOutcome::Completed(summary) => {
            assert_eq!(summary.batches, 5);
            assert_eq!(summary.sent, 2_250);
        }
        other => panic!("Expected completion, got {other:?}"),
    }

    publisher.publish_gps("12.9716,77.5946").await.unwrap();
    publisher.shutdown().await;
    broker.close();

    let consumed = GpsSubscriber::join(handles).await;
    assert_eq!(consumed, 2_251);
    assert_eq!(broker.accepted(), 2_251);
    assert_eq!(broker.dropped(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn topic_subscribers_each_see_every_message() {
    let settings = settings();
    let broker = Arc::new(MemoryBroker::new());
    let first = GpsSubscriber::new(&settings.subscriber);
    let second = GpsSubscriber::new(&settings.subscriber);

    let topic = Destination::topic(GPS_TOPIC, GPS_SUBSCRIPTION);
    let mut handles = first.attach(vec![broker.subscribe(&topic)]);
    let second_handles = second.attach(vec![broker.subscribe(&topic)]);
    handles.extend(second_handles);

    let publisher = GpsPublisher::new(broker.clone(), &settings.publisher).unwrap();
    publisher.send_bulk_messages(GPS_TOPIC, 1_200).await.unwrap();
    publisher.shutdown().await;
    broker.close();

    assert_eq!(GpsSubscriber::join(handles).await, 2_400);
    assert_eq!(first.meter().pending(), 1_200);
    assert_eq!(second.meter().pending(), 1_200);
}
