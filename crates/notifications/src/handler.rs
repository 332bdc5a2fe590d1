//! Event handler trait.

use async_trait::async_trait;
use domain::OrderEvent;

use crate::Result;

/// Reacts to order events delivered by the bus.
///
/// Handlers run off the write path: an error is logged by the consuming
/// loop and never reaches the command that produced the event.
#[async_trait]
pub trait OrderEventHandler: Send + Sync {
    /// Returns the name of this handler.
    fn name(&self) -> &'static str;

    /// Handles a single event.
    async fn handle(&self, event: &OrderEvent) -> Result<()>;
}
