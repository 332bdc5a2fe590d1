//! Order domain events.
//!
//! Events are published on the in-process bus after a state change is
//! persisted. Consumers treat them as notifications only and always re-read
//! the order before rendering anything.

use chrono::{DateTime, Utc};
use common::{OrderId, OrderNumber, RestaurantId};
use serde::{Deserialize, Serialize};

use super::{Money, PaymentMethod};

/// Events that can occur on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was placed.
    OrderCreated(OrderCreatedData),

    /// Payment was confirmed.
    OrderPaid(OrderPaidData),

    /// Kitchen started preparing the order.
    OrderPreparing(OrderPreparingData),

    /// Order is ready for pickup.
    OrderReady(OrderReadyData),

    /// Order was handed over.
    OrderCompleted(OrderCompletedData),
}

impl OrderEvent {
    /// Returns the bus topic this event is published on.
    pub fn kind(&self) -> EventKind {
        match self {
            OrderEvent::OrderCreated(_) => EventKind::OrderCreated,
            OrderEvent::OrderPaid(_) => EventKind::OrderPaid,
            OrderEvent::OrderPreparing(_) => EventKind::OrderPreparing,
            OrderEvent::OrderReady(_) => EventKind::OrderReady,
            OrderEvent::OrderCompleted(_) => EventKind::OrderCompleted,
        }
    }

    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        self.kind().as_str()
    }

    fn reference(&self) -> &OrderRef {
        match self {
            OrderEvent::OrderCreated(data) => &data.order,
            OrderEvent::OrderPaid(data) => &data.order,
            OrderEvent::OrderPreparing(data) => &data.order,
            OrderEvent::OrderReady(data) => &data.order,
            OrderEvent::OrderCompleted(data) => &data.order,
        }
    }

    pub fn order_id(&self) -> OrderId {
        self.reference().order_id
    }

    pub fn order_number(&self) -> &OrderNumber {
        &self.reference().order_number
    }

    pub fn restaurant_id(&self) -> &RestaurantId {
        &self.reference().restaurant_id
    }
}

/// Fieldless mirror of [`OrderEvent`], used as the event bus topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    OrderCreated,
    OrderPaid,
    OrderPreparing,
    OrderReady,
    OrderCompleted,
}

impl EventKind {
    /// Every event kind.
    pub const ALL: [EventKind; 5] = [
        EventKind::OrderCreated,
        EventKind::OrderPaid,
        EventKind::OrderPreparing,
        EventKind::OrderReady,
        EventKind::OrderCompleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::OrderCreated => "OrderCreated",
            EventKind::OrderPaid => "OrderPaid",
            EventKind::OrderPreparing => "OrderPreparing",
            EventKind::OrderReady => "OrderReady",
            EventKind::OrderCompleted => "OrderCompleted",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies the order an event is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRef {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub restaurant_id: RestaurantId,
}

/// Data for OrderCreated event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedData {
    #[serde(flatten)]
    pub order: OrderRef,

    /// Sum of the line subtotals.
    pub total_amount: Money,

    pub payment_method: PaymentMethod,

    /// When the order was placed.
    pub created_at: DateTime<Utc>,
}

/// Data for OrderPaid event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidData {
    #[serde(flatten)]
    pub order: OrderRef,

    pub paid_at: DateTime<Utc>,
}

/// Data for OrderPreparing event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPreparingData {
    #[serde(flatten)]
    pub order: OrderRef,

    pub preparing_at: DateTime<Utc>,
}

/// Data for OrderReady event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReadyData {
    #[serde(flatten)]
    pub order: OrderRef,

    pub ready_at: DateTime<Utc>,
}

/// Data for OrderCompleted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCompletedData {
    #[serde(flatten)]
    pub order: OrderRef,

    pub completed_at: DateTime<Utc>,
}
