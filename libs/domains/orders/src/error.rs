//! Error types for the orders domain.

use event_channel::ChannelError;
use thiserror::Error;

/// Result type for order pipeline operations.
pub type OrderResult<T> = Result<T, OrderError>;

/// Errors raised by the consumer side of the pipeline.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Event channel failure.
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Order payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The processing side effect failed.
    #[error("Processing error: {0}")]
    Processing(String),

    /// Recovery gave up after the configured number of attempts.
    #[error("Consumer recovery exhausted after {attempts} attempts")]
    RecoveryExhausted { attempts: u32 },

    /// The consume worker panicked.
    #[error("Consume worker panicked")]
    WorkerPanicked,
}

/// Errors surfaced by [`OrderProducer::place`](crate::OrderProducer::place).
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to serialize order: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The channel refused the write with an error retrying cannot fix.
    #[error("Publish rejected: {0}")]
    Rejected(#[source] ChannelError),

    #[error("Publish failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: ChannelError,
    },
}
