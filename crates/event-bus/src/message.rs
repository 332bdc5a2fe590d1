//! Delivered messages and acknowledgement tracking.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::Result;
use crate::bus::Topic;

/// Counts messages that were handed to a subscriber but not yet settled.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    pending: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    pub(crate) fn begin(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn finish(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Resolves once no message is in flight.
    pub(crate) async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent finish() cannot be missed.
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// One event delivered to one subscription.
///
/// The payload is the JSON encoding produced at publish time; it is shared
/// between all subscribers of the same publish call. A message must be settled
/// with [`Message::ack`] (or [`Message::nack`]) once the consumer is done with
/// it. Dropping an unsettled message counts as a nack and is logged.
pub struct Message<T: Topic> {
    id: Uuid,
    topic: T,
    payload: Bytes,
    published_at: DateTime<Utc>,
    tracker: Arc<InFlight>,
    settled: bool,
}

impl<T: Topic> Message<T> {
    pub(crate) fn new(
        id: Uuid,
        topic: T,
        payload: Bytes,
        published_at: DateTime<Utc>,
        tracker: Arc<InFlight>,
    ) -> Self {
        tracker.begin();
        Self {
            id,
            topic,
            payload,
            published_at,
            tracker,
            settled: false,
        }
    }

    /// Unique id assigned at publish time, shared by every subscriber's copy.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn topic(&self) -> T {
        self.topic
    }

    /// Raw JSON payload.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    /// Decodes the payload into a typed event.
    pub fn decode<E: DeserializeOwned>(&self) -> Result<E> {
        Ok(serde_json::from_slice(&self.payload)?)
    }

    /// Acknowledges successful processing.
    pub fn ack(mut self) {
        self.settle();
        metrics::counter!("event_bus_acked_total").increment(1);
    }

    /// Gives up on the message. There is no redelivery.
    pub fn nack(mut self) {
        self.settle();
        tracing::debug!(message_id = %self.id, topic = %self.topic, "message nacked");
        metrics::counter!("event_bus_nacked_total").increment(1);
    }

    /// Settles a message that never reached its subscriber.
    pub(crate) fn discard(mut self) {
        self.settle();
    }

    fn settle(&mut self) {
        if !self.settled {
            self.settled = true;
            self.tracker.finish();
        }
    }
}

impl<T: Topic> Drop for Message<T> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(message_id = %self.id, topic = %self.topic, "message dropped without ack");
            metrics::counter!("event_bus_nacked_total").increment(1);
            self.settle();
        }
    }
}

impl<T: Topic> std::fmt::Debug for Message<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id)
            .field("topic", &self.topic.to_string())
            .field("payload_len", &self.payload.len())
            .field("published_at", &self.published_at)
            .finish()
    }
}
