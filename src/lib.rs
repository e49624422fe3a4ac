//! # gpsrelay
//!
//! `gpsrelay` is a small telemetry relay: producers publish GPS payloads to a
//! destination on an external message broker, consumers receive them and
//! report throughput. The broker itself (routing, persistence, delivery
//! guarantees) lives in another process and is reached over WebSocket.
//!
//! ## Core Modules
//!
//! - `publisher`: single-message publishing and the batched, bounded-parallel
//!   bulk dispatcher.
//! - `subscriber`: the lock-free sliding-window rate meter and the delivery
//!   tasks that feed it.
//! - `broker`: the send/receive ports plus WebSocket and in-memory adapters.
//! - `config`: settings loaded from file and environment over defaults.
//! - `utils`: error types and logging setup.

pub mod broker;
pub mod config;
pub mod publisher;
pub mod subscriber;
pub mod utils;
