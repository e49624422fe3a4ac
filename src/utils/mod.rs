//! The `utils` module holds pieces shared by the publisher, the subscriber and
//! the CLI: the error types and the logging bootstrap.

pub mod error;
pub mod logging;

pub use error::{RelayError, RelayResult, SendError};

#[cfg(test)]
mod tests;
