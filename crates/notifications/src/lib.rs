//! Side effects of order events.
//!
//! Each order event kind is consumed by its own loop (see
//! [`NotificationProcessor`]). Handlers re-read the order, render it through a
//! [`FragmentRenderer`] and push the result to the kitchen and customer feeds.

pub mod error;
pub mod handler;
pub mod live_update;
pub mod processor;
pub mod renderer;

pub use error::{HandlerError, RenderError, Result};
pub use handler::OrderEventHandler;
pub use live_update::{LiveUpdateHandler, ORDERS_LIST_SELECTOR};
pub use processor::{NotificationProcessor, ProcessorHandle};
pub use renderer::{Fragment, FragmentRenderer, PlainFragmentRenderer};
