//! Integration tests for multicast delivery and shutdown.

use std::time::Duration;

use event_bus::{BusError, EventBus};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Kind {
    Created,
    Ready,
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Kind::Created => f.write_str("Created"),
            Kind::Ready => f.write_str("Ready"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Event {
    order: u32,
}

#[tokio::test]
async fn test_independent_consumers_each_see_every_event() {
    let bus = EventBus::new();
    let consumers: Vec<_> = (0..3)
        .map(|_| {
            let sub = bus.subscribe(Kind::Created).unwrap();
            tokio::spawn(async move {
                sub.take(5)
                    .map(|msg| {
                        let event: Event = msg.decode().unwrap();
                        msg.ack();
                        event.order
                    })
                    .collect::<Vec<_>>()
                    .await
            })
        })
        .collect();

    for order in 0..5 {
        assert_eq!(bus.publish(Kind::Created, &Event { order }).unwrap(), 3);
    }

    for consumer in consumers {
        assert_eq!(consumer.await.unwrap(), vec![0, 1, 2, 3, 4]);
    }
    assert_eq!(bus.pending(), 0);
}

#[tokio::test]
async fn test_slow_consumer_does_not_block_publisher() {
    let bus = EventBus::new();
    let mut slow = bus.subscribe(Kind::Ready).unwrap();

    // Nobody is reading yet; publishing must still return immediately.
    for order in 0..1_000 {
        bus.publish(Kind::Ready, &Event { order }).unwrap();
    }
    assert_eq!(bus.pending(), 1_000);

    let first = slow.recv().await.unwrap();
    assert_eq!(first.decode::<Event>().unwrap(), Event { order: 0 });
    first.ack();
}

#[tokio::test]
async fn test_shutdown_sequence_drains_and_ends_streams() {
    let bus = EventBus::new();
    let mut sub = bus.subscribe(Kind::Created).unwrap();
    let worker = tokio::spawn(async move {
        let mut seen = 0;
        while let Some(msg) = sub.recv().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
            msg.ack();
            seen += 1;
        }
        seen
    });

    for order in 0..3 {
        bus.publish(Kind::Created, &Event { order }).unwrap();
    }

    bus.close();
    bus.drain(Duration::from_secs(2)).await.unwrap();
    assert_eq!(worker.await.unwrap(), 3);
    assert!(matches!(
        bus.publish(Kind::Created, &Event { order: 9 }),
        Err(BusError::Closed)
    ));
}
