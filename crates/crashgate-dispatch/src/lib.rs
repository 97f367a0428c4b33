//! Serializes sanitized events and republishes them on the queue.

use std::sync::Arc;

use crashgate_core::{Event, Queue, QueueError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Topic all sanitized events are published on.
pub const EVENTS_TOPIC: &str = "events";

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Sole ingress call of the pipeline: the protocol front-end hands decoded,
/// already-scrubbed events here.
pub struct EventDispatcher {
    queue: Arc<dyn Queue>,
    shutdown: CancellationToken,
}

impl EventDispatcher {
    pub fn new(queue: Arc<dyn Queue>, shutdown: CancellationToken) -> Self {
        Self { queue, shutdown }
    }

    /// Serialize `event` to its JSON wire form and publish it. One publish
    /// call per event; failures propagate to the caller, never retried.
    pub async fn dispatch(&self, event: &Event) -> Result<(), DispatchError> {
        let body = event.to_json()?;

        self.queue
            .publish(&self.shutdown, EVENTS_TOPIC, &body)
            .await?;

        info!("🐞 Ingest event: {}", event.id);

        Ok(())
    }

    /// Dispatch sequentially in input order, stopping at the first failure.
    /// Trailing events stay undispatched; already-published events are not
    /// rolled back.
    pub async fn dispatch_many(&self, events: &[Event]) -> Result<(), DispatchError> {
        for event in events {
            self.dispatch(event).await?;
        }

        Ok(())
    }
}
