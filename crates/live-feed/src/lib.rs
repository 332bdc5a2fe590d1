//! Live update fan-out for the kitchen display and customer status pages.
//!
//! This crate provides:
//! - [`BroadcastHub`], a registry of bounded per-connection queues keyed by
//!   [`FeedTopic`]
//! - [`Subscription`], an RAII registration that leaves the hub on drop
//! - [`SseFrame`] and the [`datastar`] helpers for Server-Sent Events framing

pub mod datastar;
mod frame;
mod hub;
mod topic;

pub use frame::{SseFrame, keep_alive};
pub use hub::{BroadcastHub, BroadcastReport, SubscriberHandle, SubscriberId, Subscription};
pub use topic::FeedTopic;
