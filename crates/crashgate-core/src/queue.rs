use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Metadata delivered alongside a subscribed message body.
pub type SubscribeHeaders = HashMap<String, Vec<String>>;

/// Callback invoked for each delivered message.
pub type SubscribeHandler =
    Box<dyn Fn(SubscribeHeaders, String) -> Result<(), QueueError> + Send + Sync>;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("failed to establish queue connection: {0}")]
    Connection(String),

    #[error("failed to publish message: {0}")]
    Publish(String),

    #[error("failed to subscribe to channel: {0}")]
    Subscribe(String),

    #[error("subscribe handler failed: {0}")]
    Handler(String),

    #[error("queue connection closed")]
    Closed,
}

/// Capability contract for queue backends.
///
/// One long-lived handle per process, shared by all publishers; `publish`
/// must be safe for concurrent calls without external locking. Subscribe
/// semantics differ per backend: the broadcast variant loops for the life
/// of the subscription, the request-stream variant consumes exactly one
/// message and returns. Errors are returned to the caller, never retried
/// internally.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Publish a message on a topic.
    async fn publish(
        &self,
        ctx: &CancellationToken,
        topic: &str,
        payload: &str,
    ) -> Result<(), QueueError>;

    /// Subscribe to a topic, invoking `handler` per delivered message.
    async fn subscribe(
        &self,
        ctx: &CancellationToken,
        topic: &str,
        handler: SubscribeHandler,
    ) -> Result<(), QueueError>;

    /// Release the underlying connection. Called once at shutdown, after
    /// the HTTP listener has finished.
    async fn close(&self) -> Result<(), QueueError>;
}
