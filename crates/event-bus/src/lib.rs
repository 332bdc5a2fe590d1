//! In-process publish/subscribe bus.
//!
//! The bus decouples publishers (use cases committing state changes) from
//! consumers (handlers producing live updates):
//! - [`EventBus::publish`] serializes an event once and enqueues it for every
//!   current subscriber of a topic without awaiting anything
//! - [`EventBus::subscribe`] returns a [`Subscription`] that yields every message
//!   published to the topic from that moment on, in publication order
//! - every [`Message`] must be acked after processing; [`EventBus::drain`] waits
//!   for outstanding messages during shutdown

mod bus;
mod error;
mod message;
mod subscription;

pub use bus::{EventBus, Topic};
pub use error::{BusError, Result};
pub use message::Message;
pub use subscription::Subscription;
