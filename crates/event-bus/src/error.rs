//! Event bus error types.

use thiserror::Error;

/// Errors that can occur when publishing to or consuming from the bus.
#[derive(Debug, Error)]
pub enum BusError {
    /// The event could not be encoded, or a payload could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The bus has been closed and accepts no further publishes or subscriptions.
    #[error("Event bus is closed")]
    Closed,

    /// Delivered messages were still unacknowledged when the drain deadline passed.
    #[error("Drain timed out with {pending} unacknowledged message(s)")]
    DrainTimeout { pending: usize },
}

/// Result type for event bus operations.
pub type Result<T> = std::result::Result<T, BusError>;
