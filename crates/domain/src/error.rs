//! Domain error types.

use thiserror::Error;

use crate::order::OrderError;
use crate::payment::PaymentError;
use crate::repository::RepositoryError;

/// Errors returned by the order use cases.
///
/// Everything here comes from the durable-state path and is reported to the
/// caller. Notification failures never show up as a `DomainError`.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The order aggregate rejected the command.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// The referenced order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// The repository failed to persist or load an order.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// The payment collaborator refused to start a payment.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),
}
