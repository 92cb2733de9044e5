//! In-process event bus.
//!
//! Publishes onto a `tokio::sync::broadcast` channel; any number of
//! subscribers (logging, metrics, future webhooks) can attach without the
//! publisher knowing about them. A production deployment fronted by a real
//! broker would implement the same `EventBus` trait against that broker
//! instead.

use tokio::sync::broadcast;

use crate::domain::pipeline::errors::EventBusError;
use crate::domain::pipeline::events::DomainEvent;
use crate::domain::pipeline::ports::EventBus;

#[derive(Debug, Clone)]
pub struct InProcessEventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl InProcessEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl EventBus for InProcessEventBus {
    async fn publish(&self, event: DomainEvent) -> Result<(), EventBusError> {
        // No subscribers is not an error: a fresh server with nothing yet
        // listening on the bus shouldn't fail the pipeline over it.
        match self.sender.send(event) {
            Ok(_) | Err(broadcast::error::SendError(_)) => Ok(()),
        }
    }
}
