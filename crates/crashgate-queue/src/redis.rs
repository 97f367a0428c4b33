use crashgate_core::async_trait::async_trait;
use crashgate_core::{Queue, QueueError, SubscribeHandler, SubscribeHeaders};
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Broadcast backend over Redis pub/sub.
///
/// Every active subscriber receives every published message. `subscribe`
/// loops for the lifetime of the subscription; it returns only when the
/// channel closes or the caller cancels.
pub struct RedisQueue {
    client: Client,
    publisher: RwLock<Option<ConnectionManager>>,
}

impl RedisQueue {
    /// Establish the shared Redis connection. Failures here are fatal to
    /// startup; callers must not retry.
    pub async fn connect(url: &str) -> Result<Self, QueueError> {
        let client = Client::open(url).map_err(|e| QueueError::Connection(e.to_string()))?;

        let publisher = client
            .get_connection_manager()
            .await
            .map_err(|e| QueueError::Connection(e.to_string()))?;

        debug!("Established Redis queue connection");

        Ok(Self {
            client,
            publisher: RwLock::new(Some(publisher)),
        })
    }
}

#[async_trait]
impl Queue for RedisQueue {
    async fn publish(
        &self,
        ctx: &CancellationToken,
        topic: &str,
        payload: &str,
    ) -> Result<(), QueueError> {
        // The connection manager multiplexes internally; cloning it is how
        // concurrent publishers share the single connection.
        let mut conn = self
            .publisher
            .read()
            .await
            .clone()
            .ok_or(QueueError::Closed)?;

        tokio::select! {
            _ = ctx.cancelled() => {
                Err(QueueError::Publish("publish cancelled by caller".to_string()))
            }
            result = conn.publish::<_, _, i64>(topic, payload) => {
                result
                    .map(|_| ())
                    .map_err(|e| QueueError::Publish(e.to_string()))
            }
        }
    }

    async fn subscribe(
        &self,
        ctx: &CancellationToken,
        topic: &str,
        handler: SubscribeHandler,
    ) -> Result<(), QueueError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| QueueError::Subscribe(e.to_string()))?;

        pubsub
            .subscribe(topic)
            .await
            .map_err(|e| QueueError::Subscribe(e.to_string()))?;

        debug!("Subscribed to Redis channel: {}", topic);

        let messages = pubsub.on_message().filter_map(|msg| async move {
            match msg.get_payload::<String>() {
                Ok(payload) => {
                    let pattern = msg
                        .get_pattern::<Option<String>>()
                        .ok()
                        .flatten()
                        .unwrap_or_default();
                    Some((redis_headers(msg.get_channel_name(), &pattern), payload))
                }
                Err(e) => {
                    warn!("Dropping Redis message with unreadable payload: {}", e);
                    None
                }
            }
        });

        let messages = std::pin::pin!(messages);
        deliver_loop(messages, ctx, &handler).await
    }

    async fn close(&self) -> Result<(), QueueError> {
        self.publisher.write().await.take();
        debug!("Redis queue connection closed");
        Ok(())
    }
}

/// Continuous delivery: one handler invocation per message until the stream
/// ends or the caller cancels. A handler failure is logged and delivery
/// continues; one bad message must not end the subscription.
async fn deliver_loop<S>(
    mut messages: S,
    ctx: &CancellationToken,
    handler: &SubscribeHandler,
) -> Result<(), QueueError>
where
    S: futures::Stream<Item = (SubscribeHeaders, String)> + Unpin,
{
    loop {
        tokio::select! {
            _ = ctx.cancelled() => {
                debug!("Redis subscription cancelled");
                return Ok(());
            }
            message = messages.next() => match message {
                Some((headers, body)) => {
                    if let Err(e) = handler(headers, body) {
                        error!("Subscribe handler failed, continuing delivery: {}", e);
                    }
                }
                None => return Ok(()),
            }
        }
    }
}

fn redis_headers(channel: &str, pattern: &str) -> SubscribeHeaders {
    SubscribeHeaders::from([
        ("channel".to_string(), vec![channel.to_string()]),
        ("pattern".to_string(), vec![pattern.to_string()]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::{timeout, Duration};

    fn message(body: &str) -> (SubscribeHeaders, String) {
        (redis_headers("events", ""), body.to_string())
    }

    fn counting_handler(calls: Arc<AtomicUsize>) -> SubscribeHandler {
        Box::new(move |_headers, _body| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[tokio::test]
    async fn delivery_loops_over_every_message() {
        // Broadcast semantics: every message on the stream reaches the
        // handler, unlike the request-stream backend's single delivery.
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = counting_handler(calls.clone());
        let stream = futures::stream::iter(vec![message("a"), message("b"), message("c")]);

        let ctx = CancellationToken::new();
        deliver_loop(stream, &ctx, &handler).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn handler_failure_does_not_stop_delivery() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let handler: SubscribeHandler = Box::new(move |_headers, body| {
            seen.fetch_add(1, Ordering::SeqCst);
            if body == "bad" {
                Err(QueueError::Handler("boom".to_string()))
            } else {
                Ok(())
            }
        });
        let stream =
            futures::stream::iter(vec![message("bad"), message("good"), message("good")]);

        let ctx = CancellationToken::new();
        deliver_loop(stream, &ctx, &handler).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancellation_ends_the_loop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = counting_handler(calls.clone());
        // A pending stream keeps the loop parked until cancellation.
        let stream = futures::stream::pending();

        let ctx = CancellationToken::new();
        ctx.cancel();

        let result = timeout(Duration::from_secs(1), deliver_loop(stream, &ctx, &handler))
            .await
            .expect("Loop should end once cancelled");

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn headers_carry_channel_and_pattern() {
        let headers = redis_headers("events", "ev*");

        assert_eq!(headers.get("channel"), Some(&vec!["events".to_string()]));
        assert_eq!(headers.get("pattern"), Some(&vec!["ev*".to_string()]));
    }
}
