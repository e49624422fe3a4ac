//! Producer side of the relay.
//!
//! - `batch`: partitioning a bulk request into `BatchJob`s
//! - `pool`: the fixed-size FIFO worker pool batches run on
//! - `dispatcher`: `BulkDispatcher`, batches on the pool with completion signals
//! - `service`: `GpsPublisher`, the single-message and bulk entry points

pub mod batch;
pub mod dispatcher;
pub mod pool;
pub mod service;

pub use batch::{BatchJob, BatchReport, bulk_payload, plan_batches};
pub use dispatcher::{BulkDispatcher, DispatchHandle, DispatchMode, DispatchSummary};
pub use pool::WorkerPool;
pub use service::{BulkOutcome, GpsPublisher};
