//! Order use cases.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{OrderId, OrderNumber, RestaurantId};
use event_bus::EventBus;

use crate::error::DomainError;
use crate::payment::{CashPayment, PaymentError, PaymentGateway};
use crate::repository::{OrderRepository, RepositoryError};

use super::numbering::OrderNumberSequence;
use super::{
    CreateOrder, EventKind, FulfillmentStatus, Order, OrderError, OrderEvent, OrderPaidData,
    PaymentMethod, PaymentStatus,
};

/// How many times a transition is re-applied after losing a version race.
const MAX_CONFLICT_ATTEMPTS: u32 = 3;

/// How many order numbers are tried before giving up on a create.
const MAX_NUMBER_ATTEMPTS: u32 = 5;

/// Result of a successful order command.
#[derive(Debug, Clone)]
pub struct OrderOutcome {
    /// The order as persisted, including its new version.
    pub order: Order,

    /// The event produced by the command.
    pub event: OrderEvent,

    /// False when the event could not be published. The state change is
    /// committed either way.
    pub notified: bool,
}

/// Service for managing orders.
///
/// Every command persists first and publishes second. Publishing is
/// best-effort: a failure is logged and reported through
/// [`OrderOutcome::notified`], never as an error.
pub struct OrderService<R: OrderRepository> {
    repository: R,
    bus: EventBus<EventKind>,
    gateways: HashMap<PaymentMethod, Arc<dyn PaymentGateway>>,
    numbers: OrderNumberSequence,
}

impl<R: OrderRepository> OrderService<R> {
    /// Creates a service that accepts cash payments.
    pub fn new(repository: R, bus: EventBus<EventKind>) -> Self {
        Self {
            repository,
            bus,
            gateways: HashMap::new(),
            numbers: OrderNumberSequence::new(),
        }
        .with_payment_gateway(CashPayment)
    }

    /// Registers a gateway, replacing any gateway for the same method.
    pub fn with_payment_gateway(mut self, gateway: impl PaymentGateway + 'static) -> Self {
        self.gateways.insert(gateway.method(), Arc::new(gateway));
        self
    }

    /// Returns a reference to the underlying repository.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Returns the bus events are published on.
    pub fn bus(&self) -> &EventBus<EventKind> {
        &self.bus
    }

    /// Places a new order.
    ///
    /// The payment is started before anything is stored; if the gateway
    /// fails nothing is saved or published. A rejected order gives its
    /// number back, so the next order gets it.
    #[tracing::instrument(skip(self, cmd), fields(restaurant_id = %cmd.restaurant_id))]
    pub async fn create_order(&self, cmd: CreateOrder) -> Result<OrderOutcome, DomainError> {
        let now = Utc::now();
        let restaurant_id = cmd.restaurant_id.clone();
        let order_number = self.numbers.next(&restaurant_id);

        let mut order = match self.prepare(cmd, order_number.clone(), now).await {
            Ok(order) => order,
            Err(e) => {
                self.numbers.release(&restaurant_id, &order_number);
                return Err(e);
            }
        };

        let mut attempt = 1;
        loop {
            match self.repository.save(&order).await {
                Ok(()) => break,
                Err(RepositoryError::OrderNumberTaken { order_number, .. })
                    if attempt < MAX_NUMBER_ATTEMPTS =>
                {
                    attempt += 1;
                    tracing::debug!(%order_number, attempt, "Order number taken, allocating another");
                    order.renumber(self.numbers.next(&restaurant_id));
                }
                Err(e) => {
                    self.numbers.release(&restaurant_id, order.order_number());
                    return Err(e.into());
                }
            }
        }

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_id = %order.id(),
            order_number = %order.order_number(),
            total = %order.total_amount(),
            payment_method = %order.payment_method(),
            "Order created"
        );

        let event = order.created_event();
        let mut notified = self.publish(&event);

        if let Some(paid_at) = order.paid_at() {
            let paid = OrderEvent::OrderPaid(OrderPaidData {
                order: order.reference(),
                paid_at,
            });
            notified &= self.publish(&paid);
        }

        Ok(OrderOutcome {
            order,
            event,
            notified,
        })
    }

    /// Builds a validated order and starts its payment.
    async fn prepare(
        &self,
        cmd: CreateOrder,
        order_number: OrderNumber,
        now: DateTime<Utc>,
    ) -> Result<Order, DomainError> {
        let mut order = Order::create(
            cmd.order_id,
            order_number,
            cmd.restaurant_id,
            cmd.lines,
            cmd.payment_method,
            now,
        )?;

        let gateway = self
            .gateways
            .get(&order.payment_method())
            .ok_or(PaymentError::Unsupported(order.payment_method()))?;
        let receipt = gateway.initiate(&order).await?;

        match receipt.status {
            PaymentStatus::Pending => {}
            PaymentStatus::Paid => {
                order.mark_paid(now)?;
            }
            PaymentStatus::Failed | PaymentStatus::Expired => {
                return Err(PaymentError::Declined {
                    reason: format!("payment {} is {}", receipt.payment_id, receipt.status),
                }
                .into());
            }
        }
        order.attach_payment(receipt.payment_id);

        Ok(order)
    }

    /// Confirms payment for an order.
    #[tracing::instrument(skip(self))]
    pub async fn mark_paid(&self, order_id: OrderId) -> Result<OrderOutcome, DomainError> {
        self.transition(order_id, |order, now| order.mark_paid(now))
            .await
    }

    /// Starts preparation. Fails unless payment is confirmed.
    #[tracing::instrument(skip(self))]
    pub async fn mark_preparing(&self, order_id: OrderId) -> Result<OrderOutcome, DomainError> {
        self.advance(order_id, FulfillmentStatus::Preparing).await
    }

    /// Marks an order ready for pickup.
    #[tracing::instrument(skip(self))]
    pub async fn mark_ready(&self, order_id: OrderId) -> Result<OrderOutcome, DomainError> {
        self.advance(order_id, FulfillmentStatus::Ready).await
    }

    /// Marks an order as handed over.
    #[tracing::instrument(skip(self))]
    pub async fn mark_completed(&self, order_id: OrderId) -> Result<OrderOutcome, DomainError> {
        self.advance(order_id, FulfillmentStatus::Completed).await
    }

    /// Loads an order by ID.
    ///
    /// Returns None if the order doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, DomainError> {
        Ok(self.repository.find_by_id(order_id).await?)
    }

    /// Loads an order by its customer-facing number.
    #[tracing::instrument(skip(self))]
    pub async fn get_order_by_number(
        &self,
        restaurant_id: &RestaurantId,
        order_number: &OrderNumber,
    ) -> Result<Option<Order>, DomainError> {
        Ok(self
            .repository
            .find_by_order_number(restaurant_id, order_number)
            .await?)
    }

    /// Orders still on the kitchen board, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn kitchen_orders(
        &self,
        restaurant_id: &RestaurantId,
    ) -> Result<Vec<Order>, DomainError> {
        Ok(self
            .repository
            .find_active_by_restaurant(restaurant_id)
            .await?)
    }

    async fn advance(
        &self,
        order_id: OrderId,
        target: FulfillmentStatus,
    ) -> Result<OrderOutcome, DomainError> {
        self.transition(order_id, |order, now| order.advance_fulfillment(target, now))
            .await
    }

    /// Loads, applies and stores a transition, re-reading the order when
    /// another writer got there first.
    async fn transition<F>(&self, order_id: OrderId, apply: F) -> Result<OrderOutcome, DomainError>
    where
        F: Fn(&mut Order, DateTime<Utc>) -> Result<OrderEvent, OrderError>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let mut order = self
                .repository
                .find_by_id(order_id)
                .await?
                .ok_or_else(|| DomainError::OrderNotFound(order_id.to_string()))?;

            let event = apply(&mut order, Utc::now())?;

            match self.repository.update(&order).await {
                Ok(version) => {
                    order.set_version(version);

                    metrics::counter!("order_transitions_total", "kind" => event.event_type())
                        .increment(1);
                    tracing::info!(
                        order_number = %order.order_number(),
                        payment_status = %order.payment_status(),
                        fulfillment_status = %order.fulfillment_status(),
                        "Order updated"
                    );

                    let notified = self.publish(&event);
                    return Ok(OrderOutcome {
                        order,
                        event,
                        notified,
                    });
                }
                Err(RepositoryError::ConcurrencyConflict {
                    expected, actual, ..
                }) if attempt < MAX_CONFLICT_ATTEMPTS => {
                    tracing::debug!(expected, actual, attempt, "Version conflict, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn publish(&self, event: &OrderEvent) -> bool {
        match self.bus.publish(event.kind(), event) {
            Ok(subscribers) => {
                tracing::debug!(event_type = event.event_type(), subscribers, "Event published");
                true
            }
            Err(e) => {
                tracing::warn!(
                    event_type = event.event_type(),
                    order_number = %event.order_number(),
                    error = %e,
                    "Failed to publish event; state change is kept"
                );
                false
            }
        }
    }
}
