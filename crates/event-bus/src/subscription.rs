//! Per-subscriber inbound message sequence.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::Message;
use crate::bus::Topic;

/// Inbound sequence of messages for one subscriber of one topic.
///
/// Dropping the subscription unsubscribes it; the bus prunes it on the next
/// publish to the same topic.
#[derive(Debug)]
pub struct Subscription<T: Topic> {
    id: Uuid,
    topic: T,
    rx: mpsc::UnboundedReceiver<Message<T>>,
}

impl<T: Topic> Subscription<T> {
    pub(crate) fn new(id: Uuid, topic: T, rx: mpsc::UnboundedReceiver<Message<T>>) -> Self {
        Self { id, topic, rx }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn topic(&self) -> T {
        self.topic
    }

    /// Waits for the next message. Returns `None` once the bus is closed and
    /// everything queued for this subscription has been received.
    pub async fn recv(&mut self) -> Option<Message<T>> {
        self.rx.recv().await
    }
}

// Topics are plain keys and are never pinned in place.
impl<T: Topic> Unpin for Subscription<T> {}

impl<T: Topic> Stream for Subscription<T> {
    type Item = Message<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}
