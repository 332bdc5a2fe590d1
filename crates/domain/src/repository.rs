//! Order persistence interface.

use async_trait::async_trait;
use common::{OrderId, OrderNumber, RestaurantId};
use thiserror::Error;

use crate::order::Order;

/// Errors that can occur when persisting orders.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// An order with this id is already stored.
    #[error("Order already exists: {0}")]
    DuplicateOrder(OrderId),

    /// The order number is already used by another order of the restaurant.
    #[error("Order number {order_number} already taken in restaurant {restaurant_id}")]
    OrderNumberTaken {
        restaurant_id: RestaurantId,
        order_number: OrderNumber,
    },

    /// The order to update does not exist.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// The stored version did not match the version the caller loaded.
    #[error("Concurrency conflict for order {order_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        order_id: OrderId,
        expected: u64,
        actual: u64,
    },

    /// The storage backend failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Storage for [`Order`] aggregates.
///
/// Implementations must be safe to share between request handlers and
/// event consumers.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Stores a new order.
    async fn save(&self, order: &Order) -> Result<()>;

    /// Replaces a stored order if its version still matches `order.version()`.
    ///
    /// Returns the new version.
    async fn update(&self, order: &Order) -> Result<u64>;

    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>>;

    async fn find_by_order_number(
        &self,
        restaurant_id: &RestaurantId,
        order_number: &OrderNumber,
    ) -> Result<Option<Order>>;

    /// Orders of a restaurant still on the kitchen board, oldest first.
    async fn find_active_by_restaurant(&self, restaurant_id: &RestaurantId) -> Result<Vec<Order>>;
}
