//! Broadcast hub.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::FeedTopic;

/// Identifies one registered queue within the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a single [`BroadcastHub::broadcast`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Queues the payload was enqueued on.
    pub delivered: usize,

    /// Queues that were full; those subscribers miss this payload.
    pub dropped: usize,
}

/// A raw registration returned by [`BroadcastHub::add_subscriber`].
///
/// The caller must hand `id` back to [`BroadcastHub::remove_subscriber`] when
/// done. Prefer [`BroadcastHub::subscribe`], which does that automatically.
#[derive(Debug)]
pub struct SubscriberHandle {
    pub id: SubscriberId,
    pub topic: FeedTopic,
    pub receiver: mpsc::Receiver<Bytes>,
}

type Registry = HashMap<FeedTopic, HashMap<SubscriberId, mpsc::Sender<Bytes>>>;

struct Inner {
    topics: Mutex<Registry>,
    next_id: AtomicU64,
    capacity: usize,
    shut_down: AtomicBool,
}

/// Fans opaque payloads out to every open connection of a topic.
///
/// Each connection owns a bounded queue. Broadcasting never waits: when a
/// queue is full the payload is dropped for that connection only, so a
/// stalled client cannot hold up the kitchen or other customers.
///
/// The hub is a cheap `Clone` handle; clones share the same registry.
#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<Inner>,
}

impl BroadcastHub {
    /// Creates a hub whose per-connection queues hold `queue_capacity`
    /// payloads (at least one).
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                topics: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                capacity: queue_capacity.max(1),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    /// Registers a new queue under `topic`.
    ///
    /// After [`shutdown`](Self::shutdown) the returned receiver is already
    /// closed.
    pub fn add_subscriber(&self, topic: FeedTopic) -> SubscriberHandle {
        let id = SubscriberId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, receiver) = mpsc::channel(self.inner.capacity);

        let mut topics = self.lock();
        if self.is_shut_down() {
            drop(tx);
        } else {
            topics.entry(topic.clone()).or_default().insert(id, tx);
            tracing::debug!(subscriber_id = %id, %topic, "feed subscriber added");
        }
        record_subscribers(&topics);
        drop(topics);

        SubscriberHandle {
            id,
            topic,
            receiver,
        }
    }

    /// Deregisters a queue. Removing an unknown id is a no-op.
    ///
    /// Returns true if the queue was registered.
    pub fn remove_subscriber(&self, topic: &FeedTopic, id: SubscriberId) -> bool {
        let mut topics = self.lock();
        let Some(subscribers) = topics.get_mut(topic) else {
            return false;
        };

        let removed = subscribers.remove(&id).is_some();
        if subscribers.is_empty() {
            topics.remove(topic);
        }
        if removed {
            tracing::debug!(subscriber_id = %id, %topic, "feed subscriber removed");
            record_subscribers(&topics);
        }
        removed
    }

    /// Registers a queue that deregisters itself when dropped.
    pub fn subscribe(&self, topic: FeedTopic) -> Subscription {
        let handle = self.add_subscriber(topic);
        Subscription {
            hub: self.clone(),
            id: handle.id,
            topic: handle.topic,
            receiver: handle.receiver,
        }
    }

    /// Offers `payload` to every queue registered under `topic`.
    pub fn broadcast(&self, topic: &FeedTopic, payload: Bytes) -> BroadcastReport {
        // Enqueue outside the lock so registration is never blocked by a
        // large fan-out.
        let senders: Vec<(SubscriberId, mpsc::Sender<Bytes>)> = match self.lock().get(topic) {
            Some(subscribers) => subscribers
                .iter()
                .map(|(id, tx)| (*id, tx.clone()))
                .collect(),
            None => return BroadcastReport::default(),
        };

        let mut report = BroadcastReport::default();
        let mut closed = Vec::new();
        for (id, tx) in senders {
            match tx.try_send(payload.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    report.dropped += 1;
                    tracing::warn!(subscriber_id = %id, %topic, "feed queue full, dropping payload");
                }
                Err(TrySendError::Closed(_)) => closed.push(id),
            }
        }

        for id in closed {
            tracing::debug!(subscriber_id = %id, %topic, "pruning closed feed queue");
            self.remove_subscriber(topic, id);
        }

        metrics::counter!("feed_payloads_delivered_total").increment(report.delivered as u64);
        if report.dropped > 0 {
            metrics::counter!("feed_payloads_dropped_total").increment(report.dropped as u64);
        }
        tracing::trace!(%topic, delivered = report.delivered, dropped = report.dropped, "broadcast");

        report
    }

    /// Deregisters every queue. Open streams see their queue end once they
    /// have consumed what was already enqueued.
    pub fn shutdown(&self) {
        let mut topics = self.lock();
        if !self.inner.shut_down.swap(true, Ordering::SeqCst) {
            let subscribers: usize = topics.values().map(HashMap::len).sum();
            topics.clear();
            record_subscribers(&topics);
            tracing::info!(subscribers, "broadcast hub shut down");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }

    /// Number of queues registered under `topic`.
    pub fn subscriber_count(&self, topic: &FeedTopic) -> usize {
        self.lock().get(topic).map(HashMap::len).unwrap_or(0)
    }

    /// Number of topics with at least one registered queue.
    pub fn topic_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner
            .topics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for BroadcastHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastHub")
            .field("capacity", &self.inner.capacity)
            .field("topics", &self.topic_count())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

fn record_subscribers(topics: &Registry) {
    let total: usize = topics.values().map(HashMap::len).sum();
    metrics::gauge!("feed_subscribers").set(total as f64);
}

/// A hub registration that is removed when dropped.
///
/// Whatever ends the stream (client disconnect, hub shutdown, a write
/// error) drops the subscription, so no exit path leaves a queue behind.
pub struct Subscription {
    hub: BroadcastHub,
    id: SubscriberId,
    topic: FeedTopic,
    receiver: mpsc::Receiver<Bytes>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn topic(&self) -> &FeedTopic {
        &self.topic
    }

    /// Waits for the next payload. Returns `None` after the hub shut down.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.remove_subscriber(&self.topic, self.id);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .finish()
    }
}
