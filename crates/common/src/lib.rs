//! Identifier types shared across the order-fulfillment pipeline.

mod ids;

pub use ids::{MenuItemId, OrderId, OrderNumber, PaymentId, RestaurantId};
