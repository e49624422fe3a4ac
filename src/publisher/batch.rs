//! Batch planning
//!
//! A bulk request for `total` messages is cut into consecutive half-open
//! ranges of `batch_size` ordinals; the last one may be shorter. Ranges never
//! overlap and their union is exactly `[0, total)`.

use std::ops::Range;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::utils::{RelayError, RelayResult, SendError};

/// One slice of a bulk request, executed by a single worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    /// 1-based position of the batch within its request.
    pub ordinal: usize,
    pub start: u64,
    pub end: u64,
    pub destination: Arc<str>,
}

impl BatchJob {
    pub fn range(&self) -> Range<u64> {
        self.start..self.end
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Payload sent for the message with the given ordinal.
pub fn bulk_payload(index: u64) -> String {
    format!("Message-{index}")
}

/// Splits `[0, total)` into consecutive batches of at most `batch_size` messages.
pub fn plan_batches(destination: &str, total: u64, batch_size: u64) -> RelayResult<Vec<BatchJob>> {
    if batch_size == 0 {
        return Err(RelayError::InvalidConfig(
            "batch_size must be greater than zero".to_string(),
        ));
    }

    let destination: Arc<str> = Arc::from(destination);
    let capacity = usize::try_from(total.div_ceil(batch_size)).unwrap_or(0);
    let mut batches = Vec::with_capacity(capacity);

    let mut start = 0;
    while start < total {
        let end = start.saturating_add(batch_size).min(total);
        batches.push(BatchJob {
            ordinal: batches.len() + 1,
            start,
            end,
            destination: Arc::clone(&destination),
        });
        start = end;
    }

    Ok(batches)
}

/// Completion signal for one batch.
///
/// `sent` counts successful sends only. When `error` is set the batch stopped
/// at ordinal `start + sent` and the rest of its range was never attempted.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub ordinal: usize,
    pub start: u64,
    pub end: u64,
    pub sent: u64,
    pub error: Option<SendError>,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}
