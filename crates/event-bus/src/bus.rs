//! The bus itself.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::message::{InFlight, Message};
use crate::subscription::Subscription;
use crate::{BusError, Result};

/// A routing key for the bus.
///
/// Implemented for every small copyable key; in practice a fieldless enum
/// naming the event kinds, so publishers and consumers agree on the closed set
/// of topics at compile time.
pub trait Topic: Copy + Eq + Hash + fmt::Display + Send + Sync + 'static {}

impl<T> Topic for T where T: Copy + Eq + Hash + fmt::Display + Send + Sync + 'static {}

struct Slot<T: Topic> {
    id: Uuid,
    tx: mpsc::UnboundedSender<Message<T>>,
}

struct Inner<T: Topic> {
    subscribers: Mutex<HashMap<T, Vec<Slot<T>>>>,
    closed: AtomicBool,
    in_flight: Arc<InFlight>,
}

/// Topic-based multicast bus.
///
/// Every subscription owns an independent queue, so a topic with N
/// subscriptions delivers each event N times (multicast, not competing
/// consumers). Queues are unbounded: `publish` never waits for a consumer.
/// Messages published to one topic from one task reach each subscription in
/// publication order.
pub struct EventBus<T: Topic> {
    inner: Arc<Inner<T>>,
}

impl<T: Topic> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Topic> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Topic> EventBus<T> {
    /// Creates an open bus with no subscriptions.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                subscribers: Mutex::new(HashMap::new()),
                closed: AtomicBool::new(false),
                in_flight: Arc::new(InFlight::default()),
            }),
        }
    }

    /// Publishes an event to every current subscription of `topic`.
    ///
    /// Returns the number of subscriptions the message was enqueued for. Zero
    /// subscribers is not an error: the event is simply not observed.
    pub fn publish<E>(&self, topic: T, event: &E) -> Result<usize>
    where
        E: Serialize + ?Sized,
    {
        if self.is_closed() {
            return Err(BusError::Closed);
        }

        let payload = Bytes::from(serde_json::to_vec(event)?);
        let id = Uuid::new_v4();
        let published_at = Utc::now();

        let mut subscribers = self.lock();
        // Re-check under the lock so close() and publish() cannot interleave.
        if self.is_closed() {
            return Err(BusError::Closed);
        }

        let mut delivered = 0;
        if let Some(slots) = subscribers.get_mut(&topic) {
            slots.retain(|slot| {
                let message = Message::new(
                    id,
                    topic,
                    payload.clone(),
                    published_at,
                    Arc::clone(&self.inner.in_flight),
                );
                match slot.tx.send(message) {
                    Ok(()) => {
                        delivered += 1;
                        true
                    }
                    Err(mpsc::error::SendError(message)) => {
                        tracing::debug!(subscription_id = %slot.id, %topic, "pruning closed subscription");
                        message.discard();
                        false
                    }
                }
            });
            if slots.is_empty() {
                subscribers.remove(&topic);
            }
        }
        drop(subscribers);

        tracing::trace!(message_id = %id, %topic, delivered, "event published");
        metrics::counter!("event_bus_published_total", "topic" => topic.to_string()).increment(1);

        Ok(delivered)
    }

    /// Subscribes to `topic`.
    ///
    /// The subscription sees only messages published after this call returns;
    /// there is no replay.
    pub fn subscribe(&self, topic: T) -> Result<Subscription<T>> {
        let mut subscribers = self.lock();
        if self.is_closed() {
            return Err(BusError::Closed);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        subscribers.entry(topic).or_default().push(Slot { id, tx });

        tracing::debug!(subscription_id = %id, %topic, "subscribed");
        Ok(Subscription::new(id, topic, rx))
    }

    /// Number of live subscriptions for `topic`.
    pub fn subscriber_count(&self, topic: T) -> usize {
        self.lock()
            .get(&topic)
            .map(|slots| slots.iter().filter(|slot| !slot.tx.is_closed()).count())
            .unwrap_or(0)
    }

    /// Messages delivered to a subscription but not yet acked or dropped.
    pub fn pending(&self) -> usize {
        self.inner.in_flight.pending()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Stops accepting publishes and subscriptions.
    ///
    /// Each subscription still yields what was already queued for it, then
    /// ends.
    pub fn close(&self) {
        let mut subscribers = self.lock();
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            let topics = subscribers.len();
            subscribers.clear();
            tracing::info!(topics, "event bus closed");
        }
    }

    /// Waits until every delivered message has been settled.
    pub async fn drain(&self, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.inner.in_flight.wait_idle())
            .await
            .map_err(|_| BusError::DrainTimeout {
                pending: self.pending(),
            })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<T, Vec<Slot<T>>>> {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Topic> fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("topics", &self.lock().len())
            .field("pending", &self.pending())
            .field("closed", &self.is_closed())
            .finish()
    }
}
