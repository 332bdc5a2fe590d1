//! Order commands.

use common::{OrderId, RestaurantId};

use super::{OrderLine, PaymentMethod};

/// Command to place a new order from a cart snapshot.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    /// Restaurant the order is placed with.
    pub restaurant_id: RestaurantId,

    /// Lines copied from the cart.
    pub lines: Vec<OrderLine>,

    /// How the customer will pay.
    pub payment_method: PaymentMethod,

    /// Identifier for the new order; generated when not given.
    pub order_id: OrderId,
}

impl CreateOrder {
    /// Creates a new CreateOrder command with a generated order ID.
    pub fn new(
        restaurant_id: impl Into<RestaurantId>,
        lines: Vec<OrderLine>,
        payment_method: PaymentMethod,
    ) -> Self {
        Self {
            restaurant_id: restaurant_id.into(),
            lines,
            payment_method,
            order_id: OrderId::new(),
        }
    }

    /// Uses a caller-chosen order ID.
    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = order_id;
        self
    }
}
