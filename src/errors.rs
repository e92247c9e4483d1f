//! Error types shared across the crate.
//!
//! Every fallible operation returns `Result<_, TrainError>`. There is no
//! recovery path: a batching or step error aborts the whole run at the caller.

/// Errors raised by dataset construction, batching, and training steps.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}
