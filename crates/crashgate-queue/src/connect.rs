use std::sync::Arc;

use crashgate_core::{Queue, QueueError};
use tracing::info;
use url::Url;

use crate::{NatsQueue, RedisQueue};

/// Open the process-wide queue connection, selecting the backend by URL
/// scheme: `redis://`/`rediss://` for the broadcast backend, `nats://` for
/// the request-stream backend.
///
/// A failure here is unrecoverable; the caller aborts startup.
pub async fn connect(queue_url: &str) -> Result<Arc<dyn Queue>, QueueError> {
    let parsed = Url::parse(queue_url)
        .map_err(|e| QueueError::Connection(format!("invalid queue URL: {}", e)))?;

    match parsed.scheme() {
        "redis" | "rediss" => {
            info!("Using Redis queue backend");
            Ok(Arc::new(RedisQueue::connect(queue_url).await?))
        }
        "nats" => {
            info!("Using NATS queue backend");
            Ok(Arc::new(NatsQueue::connect(queue_url).await?))
        }
        other => Err(QueueError::Connection(format!(
            "unsupported queue URL scheme: {}",
            other
        ))),
    }
}
