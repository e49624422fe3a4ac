use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use super::rate_meter::{Clock, RateMeter, RateObservation, SystemClock};
use super::service::GpsSubscriber;
use crate::broker::{Destination, GPS_QUEUE, GPS_SUBSCRIPTION, GPS_TOPIC, MemoryBroker, MessageSender};
use crate::config::Settings;

/// Clock the test moves by hand.
#[derive(Default)]
struct ManualClock(AtomicU64);

impl ManualClock {
    fn set(&self, millis: u64) {
        self.0.store(millis, Ordering::SeqCst);
    }

    fn advance(&self, millis: u64) {
        self.0.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

fn manual_meter() -> (Arc<ManualClock>, Arc<RateMeter>) {
    let clock = Arc::new(ManualClock::default());
    let meter = Arc::new(RateMeter::with_clock(
        Duration::from_millis(5000),
        clock.clone(),
    ));
    (clock, meter)
}

#[test]
fn test_rate_computation() {
    let observation = RateObservation::new(10_000, 5000);
    assert!((observation.rate - 2000.0).abs() < f64::EPSILON);
    assert_eq!(RateObservation::new(5, 0).rate, 0.0);
}

#[test]
fn test_window_not_elapsed_emits_nothing() {
    let (clock, meter) = manual_meter();
    for _ in 0..10 {
        assert!(meter.on_message().is_none());
    }
    clock.set(4999);
    assert!(meter.on_message().is_none());
    assert_eq!(meter.pending(), 11);
}

#[test]
fn test_window_close_reports_rate() {
    let (clock, meter) = manual_meter();
    for _ in 0..9_999 {
        assert!(meter.on_message().is_none());
    }
    clock.set(5000);

    let observation = meter.on_message().expect("window should close");
    assert_eq!(observation.consumed, 10_000);
    assert_eq!(observation.elapsed_ms, 5000);
    assert!((observation.rate - 2000.0).abs() < 1e-9);
    assert_eq!(meter.pending(), 0);
}

#[test]
fn test_next_window_uses_only_post_reset_counts() {
    let (clock, meter) = manual_meter();
    for _ in 0..100 {
        meter.on_message();
    }
    clock.set(5000);
    assert_eq!(meter.on_message().unwrap().consumed, 101);

    for _ in 0..49 {
        assert!(meter.on_message().is_none());
    }
    clock.set(15_000);
    let observation = meter.on_message().unwrap();
    assert_eq!(observation.consumed, 50);
    assert_eq!(observation.elapsed_ms, 10_000);
    assert!((observation.rate - 5.0).abs() < 1e-9);
}

#[test]
fn test_observations_are_broadcast() {
    let (clock, meter) = manual_meter();
    let mut rx = meter.observations();
    meter.on_message();
    clock.set(6000);
    let emitted = meter.on_message().unwrap();
    assert_eq!(rx.try_recv().unwrap(), emitted);
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_concurrent_increments_are_not_lost() {
    const THREADS: usize = 8;
    const CALLS: u64 = 10_000;
    let (_clock, meter) = manual_meter();

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for _ in 0..CALLS {
                    assert!(meter.on_message().is_none());
                }
            });
        }
    });

    assert_eq!(meter.pending(), THREADS as u64 * CALLS);
}

#[test]
fn test_simultaneous_window_close_reports_once() {
    const THREADS: usize = 16;
    let (clock, meter) = manual_meter();
    meter.on_message();
    clock.set(7000);

    let barrier = Barrier::new(THREADS);
    let observations = Mutex::new(Vec::new());
    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                barrier.wait();
                if let Some(observation) = meter.on_message() {
                    observations.lock().unwrap().push(observation);
                }
            });
        }
    });

    let observations = observations.into_inner().unwrap();
    assert_eq!(observations.len(), 1);
    let total = observations[0].consumed + meter.pending();
    assert_eq!(total, THREADS as u64 + 1);
}

#[test]
fn test_one_observation_per_elapsed_window() {
    const THREADS: usize = 8;
    const CALLS: u64 = 500;
    const WINDOWS: u64 = 4;
    let (clock, meter) = manual_meter();

    let phase = Barrier::new(THREADS + 1);
    let observations = Mutex::new(Vec::new());

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for _ in 0..=WINDOWS {
                    for _ in 0..CALLS {
                        if let Some(observation) = meter.on_message() {
                            observations.lock().unwrap().push(observation);
                        }
                    }
                    // wait for the clock to move, then for everyone to see it
                    phase.wait();
                    phase.wait();
                }
            });
        }

        for _ in 0..=WINDOWS {
            phase.wait();
            clock.advance(5000);
            phase.wait();
        }
    });

    let observations = observations.into_inner().unwrap();
    // the final advance is never followed by a call
    assert_eq!(observations.len() as u64, WINDOWS);
    assert!(observations.iter().all(|o| o.elapsed_ms == 5000));

    let observed: u64 = observations.iter().map(|o| o.consumed).sum();
    assert_eq!(observed + meter.pending(), THREADS as u64 * CALLS * (WINDOWS + 1));
}

#[test]
fn test_system_clock_is_monotonic() {
    let clock = SystemClock::new();
    let first = clock.now_millis();
    thread::sleep(Duration::from_millis(5));
    assert!(clock.now_millis() >= first + 5);
}

#[test]
fn test_zero_window_is_clamped() {
    let meter = RateMeter::new(Duration::ZERO);
    assert_eq!(meter.window(), Duration::from_millis(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_queue_and_topic_feed_the_same_meter() {
    let (_clock, meter) = manual_meter();
    let subscriber = GpsSubscriber::with_meter(meter.clone());
    let broker = MemoryBroker::new();

    let queue = Destination::queue(GPS_QUEUE);
    let topic = Destination::topic(GPS_TOPIC, GPS_SUBSCRIPTION);
    let mut handles = subscriber.attach(vec![broker.subscribe(&queue), broker.subscribe(&queue)]);
    handles.extend(subscriber.attach(vec![broker.subscribe(&topic)]));

    for i in 0..30 {
        broker.send(GPS_QUEUE, &format!("Message-{i}")).await.unwrap();
    }
    for i in 0..12 {
        broker.send(GPS_TOPIC, &format!("fix-{i}")).await.unwrap();
    }
    broker.close();

    let consumed = GpsSubscriber::join(handles).await;
    assert_eq!(consumed, 42);
    assert_eq!(subscriber.meter().pending(), 42);
}

#[test]
fn test_subscriber_uses_configured_window() {
    let mut settings = Settings::default().subscriber;
    settings.window_ms = 250;
    let subscriber = GpsSubscriber::new(&settings);
    assert_eq!(subscriber.meter().window(), Duration::from_millis(250));
}
