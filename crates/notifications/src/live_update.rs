//! Handler pushing rendered orders to the live feeds.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{EventKind, Order, OrderEvent, OrderRepository};
use live_feed::datastar;
use live_feed::{BroadcastHub, FeedTopic};

use crate::{Fragment, FragmentRenderer, OrderEventHandler, RenderError, Result};

/// Element on the kitchen board new order cards are prepended to.
pub const ORDERS_LIST_SELECTOR: &str = "#orders-list";

/// Renders the current order and broadcasts it to the kitchen feed and to
/// the feed of that order.
///
/// The event only says which order changed. The order itself is always
/// re-read, since it may have moved on by the time the event is handled.
pub struct LiveUpdateHandler<R: OrderRepository> {
    orders: R,
    renderer: Arc<dyn FragmentRenderer>,
    hub: BroadcastHub,
}

impl<R: OrderRepository> LiveUpdateHandler<R> {
    pub fn new(orders: R, renderer: Arc<dyn FragmentRenderer>, hub: BroadcastHub) -> Self {
        Self {
            orders,
            renderer,
            hub,
        }
    }

    /// New cards go on top of the board; known cards are patched in place.
    fn push_kitchen_card(&self, order: &Order, is_new: bool) {
        let Some(card) = rendered("order_card", order, self.renderer.order_card(order)) else {
            return;
        };

        let payload = if is_new {
            datastar::prepend_elements(card.as_str(), ORDERS_LIST_SELECTOR)
        } else {
            datastar::patch_elements(card.as_str())
        };
        self.hub.broadcast(&FeedTopic::Kitchen, payload);
    }

    fn push_customer_status(&self, order: &Order) {
        let Some(status) = rendered("order_status", order, self.renderer.order_status(order))
        else {
            return;
        };

        self.hub.broadcast(
            &FeedTopic::order(order.order_number()),
            datastar::patch_elements(status.as_str()),
        );
    }
}

/// A failed render skips only its own target.
fn rendered(
    view: &'static str,
    order: &Order,
    result: std::result::Result<Fragment, RenderError>,
) -> Option<Fragment> {
    match result {
        Ok(fragment) => Some(fragment),
        Err(e) => {
            tracing::warn!(view, order_number = %order.order_number(), error = %e, "render failed");
            None
        }
    }
}

#[async_trait]
impl<R: OrderRepository> OrderEventHandler for LiveUpdateHandler<R> {
    fn name(&self) -> &'static str {
        "LiveUpdateHandler"
    }

    #[tracing::instrument(skip(self, event), fields(event_type = event.event_type(), order_number = %event.order_number()))]
    async fn handle(&self, event: &OrderEvent) -> Result<()> {
        let Some(order) = self.orders.find_by_id(event.order_id()).await? else {
            tracing::warn!(order_id = %event.order_id(), "order not found, skipping live update");
            return Ok(());
        };

        match event.kind() {
            EventKind::OrderCreated => {
                self.push_kitchen_card(&order, true);
            }
            EventKind::OrderPaid
            | EventKind::OrderPreparing
            | EventKind::OrderReady
            | EventKind::OrderCompleted => {
                self.push_kitchen_card(&order, false);
                self.push_customer_status(&order);
            }
        }

        Ok(())
    }
}
