//! Order aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod numbering;
mod service;
mod state;
mod value_objects;

pub use aggregate::Order;
pub use commands::CreateOrder;
pub use events::{
    EventKind, OrderCompletedData, OrderCreatedData, OrderEvent, OrderPaidData,
    OrderPreparingData, OrderReadyData, OrderRef,
};
pub use service::{OrderOutcome, OrderService};
pub use state::{FulfillmentStatus, PaymentMethod, PaymentStatus};
pub use value_objects::{Money, OrderLine};

use thiserror::Error;

/// Errors that can occur during order operations.
///
/// All of them are validation failures: they are raised before the order is
/// mutated, so a rejected command leaves no trace.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// An order needs at least one line.
    #[error("Order must contain at least one item")]
    EmptyOrder,

    /// The summed line subtotals are not positive.
    ///
    /// Cannot occur while every line has a positive quantity and price.
    #[error("Order total must be greater than zero (got {total})")]
    NonPositiveTotal { total: Money },

    /// The summed line subtotals do not fit in the money representation.
    #[error("Order total is too large")]
    TotalOverflow,

    /// Invalid quantity.
    #[error("Invalid quantity for {menu_item_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { menu_item_id: String, quantity: u32 },

    /// Invalid price.
    #[error("Invalid price for {menu_item_id}: {price} (must be greater than 0)")]
    InvalidPrice { menu_item_id: String, price: Money },

    /// Fulfillment status change not present in the transition table.
    #[error("Invalid status transition: cannot move order from {from} to {to}")]
    InvalidTransition {
        from: FulfillmentStatus,
        to: FulfillmentStatus,
    },

    /// Preparation can only start once payment is confirmed.
    #[error("Cannot prepare unpaid order (payment status is {payment_status})")]
    PaymentRequired { payment_status: PaymentStatus },

    /// Payment was already confirmed.
    #[error("Order is already paid")]
    AlreadyPaid,

    /// Payment failed or expired and can no longer be confirmed.
    #[error("Payment can no longer be confirmed (payment status is {payment_status})")]
    PaymentClosed { payment_status: PaymentStatus },
}
