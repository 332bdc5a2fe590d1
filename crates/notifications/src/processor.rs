//! Consumption loops feeding bus messages to a handler.

use std::sync::Arc;

use domain::{EventKind, OrderEvent};
use event_bus::{EventBus, Message, Subscription};
use tokio::task::JoinHandle;

use crate::OrderEventHandler;

/// Starts one consumption loop per event kind.
///
/// Each loop processes its messages strictly in arrival order and acks each
/// one after the handler returns. A handler error is logged and the message
/// nacked; the loop carries on with the next message.
pub struct NotificationProcessor;

impl NotificationProcessor {
    /// Subscribes `handler` to every [`EventKind`] on `bus`.
    pub fn start(
        bus: &EventBus<EventKind>,
        handler: Arc<dyn OrderEventHandler>,
    ) -> event_bus::Result<ProcessorHandle> {
        let subscriptions = EventKind::ALL
            .into_iter()
            .map(|kind| bus.subscribe(kind))
            .collect::<event_bus::Result<Vec<_>>>()?;

        let tasks = subscriptions
            .into_iter()
            .map(|subscription| tokio::spawn(consume(subscription, Arc::clone(&handler))))
            .collect();

        tracing::info!(
            handler = handler.name(),
            loops = EventKind::ALL.len(),
            "notification processor started"
        );
        Ok(ProcessorHandle { tasks })
    }
}

async fn consume(mut subscription: Subscription<EventKind>, handler: Arc<dyn OrderEventHandler>) {
    let kind = subscription.topic();
    tracing::debug!(%kind, handler = handler.name(), "consumption loop started");

    while let Some(message) = subscription.recv().await {
        process(message, handler.as_ref()).await;
    }

    tracing::debug!(%kind, "consumption loop stopped");
}

async fn process(message: Message<EventKind>, handler: &dyn OrderEventHandler) {
    let kind = message.topic();

    let event: OrderEvent = match message.decode() {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(message_id = %message.id(), %kind, error = %e, "undecodable event");
            message.nack();
            return;
        }
    };

    match handler.handle(&event).await {
        Ok(()) => {
            metrics::counter!("notifications_handled_total", "kind" => kind.as_str()).increment(1);
            message.ack();
        }
        Err(e) => {
            tracing::warn!(
                message_id = %message.id(),
                %kind,
                order_number = %event.order_number(),
                error = %e,
                "handler failed"
            );
            message.nack();
        }
    }
}

/// Running consumption loops.
#[derive(Debug)]
pub struct ProcessorHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl ProcessorHandle {
    /// Number of running loops.
    pub fn loop_count(&self) -> usize {
        self.tasks.len()
    }

    /// Waits for every loop to finish. Loops finish once the bus is closed
    /// and their queued messages are handled.
    pub async fn join(self) {
        for task in self.tasks {
            match task.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => tracing::debug!("consumption loop aborted"),
                Err(e) => tracing::error!(error = %e, "consumption loop panicked"),
            }
        }
    }

    /// Stops every loop without waiting for queued messages.
    pub fn abort(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use domain::{Money, Order, OrderId, OrderLine, OrderNumber, PaymentMethod, RestaurantId};

    use super::*;
    use crate::{HandlerError, RenderError};

    #[derive(Default)]
    struct Counting {
        handled: AtomicUsize,
    }

    #[async_trait]
    impl OrderEventHandler for Counting {
        fn name(&self) -> &'static str {
            "Counting"
        }

        async fn handle(&self, _event: &OrderEvent) -> crate::Result<()> {
            self.handled.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl OrderEventHandler for Failing {
        fn name(&self) -> &'static str {
            "Failing"
        }

        async fn handle(&self, _event: &OrderEvent) -> crate::Result<()> {
            Err(HandlerError::Render(RenderError::Template("boom".into())))
        }
    }

    fn sample_order() -> Order {
        Order::create(
            OrderId::new(),
            OrderNumber::new("0001"),
            RestaurantId::new("restaurant_1"),
            vec![OrderLine::new("burger", "Burger", 1, Money::from_cents(1000)).unwrap()],
            PaymentMethod::Cash,
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_one_loop_per_event_kind() {
        let bus = EventBus::new();
        let handle = NotificationProcessor::start(&bus, Arc::new(Counting::default())).unwrap();

        assert_eq!(handle.loop_count(), EventKind::ALL.len());
        for kind in EventKind::ALL {
            assert_eq!(bus.subscriber_count(kind), 1);
        }

        bus.close();
        handle.join().await;
    }

    #[tokio::test]
    async fn test_messages_are_handled_and_acked() {
        let bus = EventBus::new();
        let handler = Arc::new(Counting::default());
        let handle = NotificationProcessor::start(&bus, handler.clone()).unwrap();

        let mut order = sample_order();
        bus.publish(EventKind::OrderCreated, &order.created_event()).unwrap();
        let paid = order.mark_paid(Utc::now()).unwrap();
        bus.publish(paid.kind(), &paid).unwrap();

        bus.close();
        bus.drain(Duration::from_secs(1)).await.unwrap();
        handle.join().await;

        assert_eq!(handler.handled.load(Ordering::SeqCst), 2);
        assert_eq!(bus.pending(), 0);
    }

    #[tokio::test]
    async fn test_handler_failure_does_not_stop_the_loop() {
        let bus = EventBus::new();
        let handle = NotificationProcessor::start(&bus, Arc::new(Failing)).unwrap();

        let order = sample_order();
        for _ in 0..3 {
            bus.publish(EventKind::OrderCreated, &order.created_event()).unwrap();
        }

        bus.close();
        bus.drain(Duration::from_secs(1)).await.unwrap();
        handle.join().await;
        assert_eq!(bus.pending(), 0);
    }

    #[tokio::test]
    async fn test_undecodable_message_is_nacked() {
        let bus = EventBus::new();
        let handler = Arc::new(Counting::default());
        let handle = NotificationProcessor::start(&bus, handler.clone()).unwrap();

        bus.publish(EventKind::OrderReady, "not an order event").unwrap();

        bus.close();
        bus.drain(Duration::from_secs(1)).await.unwrap();
        handle.join().await;
        assert_eq!(handler.handled.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_start_on_closed_bus_fails() {
        let bus = EventBus::new();
        bus.close();
        assert!(NotificationProcessor::start(&bus, Arc::new(Counting::default())).is_err());
    }
}
