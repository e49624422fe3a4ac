//! Consumer side of the relay.
//!
//! - `rate_meter`: the shared, lock-free throughput counter
//! - `consumer`: delivery tasks that drain a `MessageSource` into the meter
//! - `service`: `GpsSubscriber`, wiring queue and topic consumers to one meter

pub mod consumer;
pub mod rate_meter;
pub mod service;

pub use consumer::spawn_consumers;
pub use rate_meter::{Clock, RateMeter, RateObservation, SystemClock};
pub use service::GpsSubscriber;

#[cfg(test)]
mod tests;
