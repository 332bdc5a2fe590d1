//! In-memory order repository.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, OrderNumber, RestaurantId};
use tokio::sync::RwLock;

use crate::order::Order;
use crate::repository::{OrderRepository, RepositoryError, Result};

/// In-memory [`OrderRepository`].
///
/// Cloning is cheap and every clone shares the same storage.
#[derive(Clone, Default)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, order: &Order) -> Result<()> {
        let mut orders = self.orders.write().await;

        if orders.contains_key(&order.id()) {
            return Err(RepositoryError::DuplicateOrder(order.id()));
        }

        let number_taken = orders.values().any(|existing| {
            existing.restaurant_id() == order.restaurant_id()
                && existing.order_number() == order.order_number()
        });
        if number_taken {
            return Err(RepositoryError::OrderNumberTaken {
                restaurant_id: order.restaurant_id().clone(),
                order_number: order.order_number().clone(),
            });
        }

        orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn update(&self, order: &Order) -> Result<u64> {
        let mut orders = self.orders.write().await;

        let stored = orders
            .get_mut(&order.id())
            .ok_or(RepositoryError::NotFound(order.id()))?;

        if stored.version() != order.version() {
            return Err(RepositoryError::ConcurrencyConflict {
                order_id: order.id(),
                expected: order.version(),
                actual: stored.version(),
            });
        }

        let new_version = order.version() + 1;
        let mut updated = order.clone();
        updated.set_version(new_version);
        *stored = updated;

        Ok(new_version)
    }

    async fn find_by_id(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&order_id).cloned())
    }

    async fn find_by_order_number(
        &self,
        restaurant_id: &RestaurantId,
        order_number: &OrderNumber,
    ) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .find(|order| {
                order.restaurant_id() == restaurant_id && order.order_number() == order_number
            })
            .cloned())
    }

    async fn find_active_by_restaurant(&self, restaurant_id: &RestaurantId) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut active: Vec<Order> = orders
            .values()
            .filter(|order| order.restaurant_id() == restaurant_id && order.is_active())
            .cloned()
            .collect();
        active.sort_by_key(|order| (order.created_at(), order.order_number().clone()));
        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::order::{FulfillmentStatus, Money, OrderLine, PaymentMethod};

    fn order(restaurant: &str, number: &str, minutes_ago: i64) -> Order {
        Order::create(
            OrderId::new(),
            OrderNumber::new(number),
            RestaurantId::new(restaurant),
            vec![OrderLine::new("burger", "Burger", 1, Money::from_cents(1000)).unwrap()],
            PaymentMethod::Cash,
            Utc::now() - Duration::minutes(minutes_ago),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let repo = InMemoryOrderRepository::new();
        let order = order("restaurant_1", "0001", 0);
        repo.save(&order).await.unwrap();

        assert_eq!(repo.find_by_id(order.id()).await.unwrap(), Some(order.clone()));
        let by_number = repo
            .find_by_order_number(&RestaurantId::new("restaurant_1"), &OrderNumber::new("0001"))
            .await
            .unwrap();
        assert_eq!(by_number.map(|o| o.id()), Some(order.id()));
        assert!(repo.find_by_id(OrderId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_rejects_duplicates() {
        let repo = InMemoryOrderRepository::new();
        let order = order("restaurant_1", "0001", 0);
        repo.save(&order).await.unwrap();

        assert!(matches!(
            repo.save(&order).await,
            Err(RepositoryError::DuplicateOrder(_))
        ));
        assert!(matches!(
            repo.save(&self::order("restaurant_1", "0001", 0)).await,
            Err(RepositoryError::OrderNumberTaken { .. })
        ));

        // Same number at another restaurant is fine.
        repo.save(&self::order("restaurant_2", "0001", 0)).await.unwrap();
        assert_eq!(repo.order_count().await, 2);
    }

    #[tokio::test]
    async fn test_update_is_compare_and_swap() {
        let repo = InMemoryOrderRepository::new();
        let mut order = order("restaurant_1", "0001", 0);
        repo.save(&order).await.unwrap();

        let stale = order.clone();
        order.mark_paid(Utc::now()).unwrap();
        assert_eq!(repo.update(&order).await.unwrap(), 1);

        let err = repo.update(&stale).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::ConcurrencyConflict {
                expected: 0,
                actual: 1,
                ..
            }
        ));

        let stored = repo.find_by_id(order.id()).await.unwrap().unwrap();
        assert_eq!(stored.version(), 1);
        assert!(stored.paid_at().is_some());
    }

    #[tokio::test]
    async fn test_update_unknown_order() {
        let repo = InMemoryOrderRepository::new();
        let order = order("restaurant_1", "0001", 0);
        assert!(matches!(
            repo.update(&order).await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_find_active_sorted_oldest_first() {
        let repo = InMemoryOrderRepository::new();
        let newest = order("restaurant_1", "0003", 1);
        let oldest = order("restaurant_1", "0001", 10);
        let middle = order("restaurant_1", "0002", 5);
        let elsewhere = order("restaurant_2", "0001", 20);
        let mut done = order("restaurant_1", "0004", 30);

        done.mark_paid(Utc::now()).unwrap();
        for target in [
            FulfillmentStatus::Preparing,
            FulfillmentStatus::Ready,
            FulfillmentStatus::Completed,
        ] {
            done.advance_fulfillment(target, Utc::now()).unwrap();
        }

        for order in [&newest, &oldest, &middle, &elsewhere, &done] {
            repo.save(order).await.unwrap();
        }

        let active = repo
            .find_active_by_restaurant(&RestaurantId::new("restaurant_1"))
            .await
            .unwrap();
        let numbers: Vec<&str> = active.iter().map(|o| o.order_number().as_str()).collect();
        assert_eq!(numbers, vec!["0001", "0002", "0003"]);
    }
}
