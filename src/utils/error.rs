//! Error types shared across the relay.
//!
//! `SendError` describes a failed interaction with the external broker and is
//! what a `MessageSender` returns. `RelayError` is the crate-level error that
//! configuration, dispatch and the CLI propagate.

use thiserror::Error;

/// Failure of a single send (or subscribe) against the external broker.
///
/// All variants are treated as transient I/O failures: a batch that hits one
/// stops sending, sibling batches are unaffected.
#[derive(Debug, Clone, Error)]
pub enum SendError {
    #[error("could not connect to broker: {0}")]
    Connect(String),
    #[error("broker transport error: {0}")]
    Transport(String),
    #[error("could not encode frame: {0}")]
    Encode(String),
    #[error("broker connection is closed")]
    Closed,
    #[error("send panicked: {0}")]
    Panicked(String),
}

impl From<serde_json::Error> for SendError {
    fn from(value: serde_json::Error) -> Self {
        SendError::Encode(value.to_string())
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("message count must not be negative, got {0}")]
    NegativeCount(i64),
    #[error(transparent)]
    Send(#[from] SendError),
    #[error("batch {ordinal} aborted after {sent} messages: {source}")]
    BatchFailed {
        ordinal: usize,
        sent: u64,
        source: SendError,
    },
    #[error("batch {0} ended without reporting completion")]
    BatchLost(usize),
    #[error("worker pool is shut down")]
    PoolClosed,
    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

pub type RelayResult<T> = Result<T, RelayError>;
