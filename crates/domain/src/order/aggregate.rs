//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{OrderId, OrderNumber, PaymentId, RestaurantId};
use serde::{Deserialize, Serialize};

use super::{
    FulfillmentStatus, Money, OrderError, OrderEvent, OrderLine, PaymentMethod, PaymentStatus,
    events::{
        OrderCompletedData, OrderCreatedData, OrderPaidData, OrderPreparingData, OrderReadyData,
        OrderRef,
    },
};

/// Order aggregate root.
///
/// Carries two orthogonal state machines: [`PaymentStatus`] tracks whether
/// the money has been collected, [`FulfillmentStatus`] tracks the kitchen.
/// Every command validates first and mutates only on success, so a rejected
/// command never leaves a half-applied order behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    order_number: OrderNumber,
    restaurant_id: RestaurantId,
    lines: Vec<OrderLine>,
    total_amount: Money,
    payment_method: PaymentMethod,
    payment_id: Option<PaymentId>,
    payment_status: PaymentStatus,
    fulfillment_status: FulfillmentStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    preparing_at: Option<DateTime<Utc>>,
    ready_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,

    /// Current version for optimistic concurrency.
    #[serde(default)]
    version: u64,
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn order_number(&self) -> &OrderNumber {
        &self.order_number
    }

    pub fn restaurant_id(&self) -> &RestaurantId {
        &self.restaurant_id
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Returns the total quantity of all lines.
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(OrderLine::quantity).sum()
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn payment_id(&self) -> Option<PaymentId> {
        self.payment_id
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn fulfillment_status(&self) -> FulfillmentStatus {
        self.fulfillment_status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn preparing_at(&self) -> Option<DateTime<Utc>> {
        self.preparing_at
    }

    pub fn ready_at(&self) -> Option<DateTime<Utc>> {
        self.ready_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns true while the order is placed but payment is not confirmed.
    ///
    /// The fulfillment status of such an order still reads `paid`, so views
    /// should check this before showing it as ready to cook.
    pub fn is_awaiting_payment(&self) -> bool {
        self.payment_status == PaymentStatus::Pending
    }

    /// Returns true if the order is still on the kitchen board.
    pub fn is_active(&self) -> bool {
        self.fulfillment_status.is_active()
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    pub(crate) fn renumber(&mut self, order_number: OrderNumber) {
        self.order_number = order_number;
    }

    /// Returns the identifiers carried by every event about this order.
    pub fn reference(&self) -> OrderRef {
        OrderRef {
            order_id: self.id,
            order_number: self.order_number.clone(),
            restaurant_id: self.restaurant_id.clone(),
        }
    }
}

// Command methods
impl Order {
    /// Creates a new order from a cart snapshot.
    ///
    /// The order starts with payment `pending` and fulfillment `paid`.
    pub fn create(
        id: OrderId,
        order_number: OrderNumber,
        restaurant_id: RestaurantId,
        lines: Vec<OrderLine>,
        payment_method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        if lines.is_empty() {
            return Err(OrderError::EmptyOrder);
        }

        let mut total_amount = Money::zero();
        for line in &lines {
            // Lines are validated on construction but may also arrive through
            // deserialization, so check them again here.
            let line = OrderLine::new(
                line.menu_item_id().clone(),
                line.name(),
                line.quantity(),
                line.unit_price(),
            )?;
            total_amount = line
                .subtotal()
                .and_then(|subtotal| total_amount.checked_add(subtotal))
                .ok_or(OrderError::TotalOverflow)?;
        }

        if !total_amount.is_positive() {
            return Err(OrderError::NonPositiveTotal {
                total: total_amount,
            });
        }

        Ok(Self {
            id,
            order_number,
            restaurant_id,
            lines,
            total_amount,
            payment_method,
            payment_id: None,
            payment_status: PaymentStatus::Pending,
            fulfillment_status: FulfillmentStatus::Paid,
            created_at: now,
            updated_at: now,
            paid_at: None,
            preparing_at: None,
            ready_at: None,
            completed_at: None,
            version: 0,
        })
    }

    /// Returns the event announcing this order's creation.
    pub fn created_event(&self) -> OrderEvent {
        OrderEvent::OrderCreated(OrderCreatedData {
            order: self.reference(),
            total_amount: self.total_amount,
            payment_method: self.payment_method,
            created_at: self.created_at,
        })
    }

    /// Records the payment started for this order.
    pub fn attach_payment(&mut self, payment_id: PaymentId) {
        self.payment_id = Some(payment_id);
    }

    /// Confirms payment. Fulfillment status is left untouched.
    pub fn mark_paid(&mut self, now: DateTime<Utc>) -> Result<OrderEvent, OrderError> {
        match self.payment_status {
            PaymentStatus::Pending => {}
            PaymentStatus::Paid => return Err(OrderError::AlreadyPaid),
            payment_status @ (PaymentStatus::Failed | PaymentStatus::Expired) => {
                return Err(OrderError::PaymentClosed { payment_status });
            }
        }

        self.payment_status = PaymentStatus::Paid;
        self.paid_at = Some(now);
        self.updated_at = now;

        Ok(OrderEvent::OrderPaid(OrderPaidData {
            order: self.reference(),
            paid_at: now,
        }))
    }

    /// Moves fulfillment status one step forward.
    ///
    /// Only transitions in the table are accepted, and preparation requires
    /// confirmed payment.
    pub fn advance_fulfillment(
        &mut self,
        target: FulfillmentStatus,
        now: DateTime<Utc>,
    ) -> Result<OrderEvent, OrderError> {
        let from = self.fulfillment_status;
        if !from.can_transition_to(target) {
            return Err(OrderError::InvalidTransition { from, to: target });
        }

        if target == FulfillmentStatus::Preparing && !self.payment_status.is_paid() {
            return Err(OrderError::PaymentRequired {
                payment_status: self.payment_status,
            });
        }

        let order = self.reference();
        let (event, stamp) = match target {
            FulfillmentStatus::Preparing => (
                OrderEvent::OrderPreparing(OrderPreparingData {
                    order,
                    preparing_at: now,
                }),
                &mut self.preparing_at,
            ),
            FulfillmentStatus::Ready => (
                OrderEvent::OrderReady(OrderReadyData {
                    order,
                    ready_at: now,
                }),
                &mut self.ready_at,
            ),
            FulfillmentStatus::Completed => (
                OrderEvent::OrderCompleted(OrderCompletedData {
                    order,
                    completed_at: now,
                }),
                &mut self.completed_at,
            ),
            FulfillmentStatus::Paid => {
                return Err(OrderError::InvalidTransition { from, to: target });
            }
        };

        *stamp = Some(now);
        self.fulfillment_status = target;
        self.updated_at = now;

        Ok(event)
    }
}
