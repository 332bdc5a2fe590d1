//! Server-Sent Events endpoints.
//!
//! Each request registers one subscriber with the hub and then forwards its
//! queue to the client verbatim. A stream moves through three states:
//!
//! - connecting: the subscription exists but the body has not been polled yet
//! - streaming: waiting on the next payload or the keep-alive timer
//! - closed: the queue ended (hub shutdown) or the client went away
//!
//! Dropping the body drops the [`Subscription`], which deregisters it.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::HeaderName;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use domain::{OrderNumber, OrderRepository};
use futures_util::stream;
use live_feed::{BroadcastHub, FeedTopic, Subscription};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

use crate::AppState;

/// GET /kitchen/stream: live feed of the kitchen board.
#[tracing::instrument(skip(state))]
pub async fn kitchen<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
) -> Response {
    live_stream(&state.hub, FeedTopic::Kitchen, state.keep_alive)
}

/// GET /order/:number/stream: live status of one order.
///
/// An unknown number is not rejected; the stream just stays quiet until an
/// order with that number changes.
#[tracing::instrument(skip(state))]
pub async fn order<R: OrderRepository + 'static>(
    State(state): State<Arc<AppState<R>>>,
    Path(number): Path<String>,
) -> Response {
    let topic = FeedTopic::order(&OrderNumber::new(number));
    live_stream(&state.hub, topic, state.keep_alive)
}

fn live_stream(hub: &BroadcastHub, topic: FeedTopic, keep_alive: Duration) -> Response {
    let feed = match topic {
        FeedTopic::Kitchen => "kitchen",
        FeedTopic::Order(_) => "order",
    };
    metrics::counter!("feed_streams_opened_total", "feed" => feed).increment(1);

    let state = StreamState::Connecting {
        subscription: hub.subscribe(topic),
        keep_alive,
    };

    (
        [
            (CONTENT_TYPE, "text/event-stream"),
            (CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Body::from_stream(stream::unfold(state, StreamState::advance)),
    )
        .into_response()
}

enum StreamState {
    Connecting {
        subscription: Subscription,
        keep_alive: Duration,
    },
    Streaming {
        subscription: Subscription,
        keep_alive: Interval,
    },
}

impl StreamState {
    /// Produces the next chunk of the body, or `None` once the stream is closed.
    async fn advance(self) -> Option<(Result<Bytes, Infallible>, Self)> {
        let (mut subscription, mut keep_alive) = match self {
            StreamState::Connecting {
                subscription,
                keep_alive,
            } => {
                tracing::debug!(topic = %subscription.topic(), "stream connected");
                let mut ticker = interval_at(Instant::now() + keep_alive, keep_alive);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                (subscription, ticker)
            }
            StreamState::Streaming {
                subscription,
                keep_alive,
            } => (subscription, keep_alive),
        };

        let chunk = tokio::select! {
            biased;
            payload = subscription.recv() => payload,
            _ = keep_alive.tick() => Some(live_feed::keep_alive()),
        };

        match chunk {
            Some(bytes) => Some((
                Ok(bytes),
                StreamState::Streaming {
                    subscription,
                    keep_alive,
                },
            )),
            None => {
                tracing::debug!(topic = %subscription.topic(), "stream closed");
                None
            }
        }
    }
}
