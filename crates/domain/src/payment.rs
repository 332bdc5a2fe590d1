//! Payment collaborator invoked when an order is placed.

use async_trait::async_trait;
use common::PaymentId;
use thiserror::Error;

use crate::order::{Order, PaymentMethod, PaymentStatus};

/// Errors raised while starting a payment.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// No gateway is registered for the payment method.
    #[error("Unsupported payment method: {0}")]
    Unsupported(PaymentMethod),

    /// The gateway refused the payment.
    #[error("Payment declined: {reason}")]
    Declined { reason: String },

    /// The gateway could not be reached or answered with garbage.
    #[error("Payment gateway error: {0}")]
    Gateway(String),
}

/// Outcome of starting a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub payment_id: PaymentId,

    /// `Pending` when confirmation comes later, `Paid` when the gateway
    /// settled immediately.
    pub status: PaymentStatus,
}

impl PaymentReceipt {
    pub fn pending() -> Self {
        Self {
            payment_id: PaymentId::new(),
            status: PaymentStatus::Pending,
        }
    }
}

/// Starts payments for one [`PaymentMethod`].
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// The payment method this gateway handles.
    fn method(&self) -> PaymentMethod;

    /// Starts a payment for a validated, not yet persisted order.
    async fn initiate(&self, order: &Order) -> Result<PaymentReceipt, PaymentError>;
}

/// Cash at the counter. Staff confirm the payment later with mark-paid.
#[derive(Debug, Clone, Copy, Default)]
pub struct CashPayment;

#[async_trait]
impl PaymentGateway for CashPayment {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Cash
    }

    async fn initiate(&self, order: &Order) -> Result<PaymentReceipt, PaymentError> {
        let receipt = PaymentReceipt::pending();
        tracing::debug!(
            order_number = %order.order_number(),
            payment_id = %receipt.payment_id,
            amount = %order.total_amount(),
            "Cash payment pending"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use common::{OrderId, OrderNumber, RestaurantId};

    use super::*;
    use crate::order::{Money, OrderLine};

    #[tokio::test]
    async fn test_cash_payment_is_pending() {
        let order = Order::create(
            OrderId::new(),
            OrderNumber::new("0001"),
            RestaurantId::new("restaurant_1"),
            vec![OrderLine::new("burger", "Burger", 1, Money::from_cents(1000)).unwrap()],
            PaymentMethod::Cash,
            Utc::now(),
        )
        .unwrap();

        let gateway = CashPayment;
        assert_eq!(gateway.method(), PaymentMethod::Cash);

        let first = gateway.initiate(&order).await.unwrap();
        let second = gateway.initiate(&order).await.unwrap();
        assert_eq!(first.status, PaymentStatus::Pending);
        assert_ne!(first.payment_id, second.payment_id);
    }
}
