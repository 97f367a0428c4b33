use async_nats::HeaderMap;
use crashgate_core::async_trait::async_trait;
use crashgate_core::{Queue, QueueError, SubscribeHandler, SubscribeHeaders};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Request-stream backend over NATS.
///
/// `subscribe` consumes exactly one message, invokes the handler once,
/// unsubscribes and returns. It does not loop; this must not be unified
/// with the broadcast backend's continuous delivery.
pub struct NatsQueue {
    client: async_nats::Client,
}

impl NatsQueue {
    /// Establish the shared NATS connection. Failures here are fatal to
    /// startup; callers must not retry.
    pub async fn connect(url: &str) -> Result<Self, QueueError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| QueueError::Connection(e.to_string()))?;

        debug!("Established NATS queue connection");

        Ok(Self { client })
    }
}

#[async_trait]
impl Queue for NatsQueue {
    async fn publish(
        &self,
        ctx: &CancellationToken,
        topic: &str,
        payload: &str,
    ) -> Result<(), QueueError> {
        tokio::select! {
            _ = ctx.cancelled() => {
                Err(QueueError::Publish("publish cancelled by caller".to_string()))
            }
            result = self.client.publish(topic.to_string(), payload.to_owned().into()) => {
                result.map_err(|e| QueueError::Publish(e.to_string()))
            }
        }
    }

    async fn subscribe(
        &self,
        ctx: &CancellationToken,
        topic: &str,
        handler: SubscribeHandler,
    ) -> Result<(), QueueError> {
        let mut subscriber = self
            .client
            .subscribe(topic.to_string())
            .await
            .map_err(|e| QueueError::Subscribe(e.to_string()))?;

        debug!("Subscribed to NATS subject: {}", topic);

        let messages = (&mut subscriber).map(|message| {
            let body = String::from_utf8_lossy(&message.payload).into_owned();
            (nats_headers(message.headers.as_ref()), body)
        });

        let result = consume_one(messages, ctx, &handler).await;

        if let Err(e) = subscriber.unsubscribe().await {
            warn!("Failed to unsubscribe from NATS subject {}: {}", topic, e);
        }

        result
    }

    async fn close(&self) -> Result<(), QueueError> {
        self.client
            .drain()
            .await
            .map_err(|e| QueueError::Connection(e.to_string()))?;

        debug!("NATS queue connection drained");

        Ok(())
    }
}

/// Single delivery: wait for one message, hand it to the handler, done.
/// The handler's failure is returned to the caller; with exactly one
/// delivery there is no later message to keep going for.
async fn consume_one<S>(
    mut messages: S,
    ctx: &CancellationToken,
    handler: &SubscribeHandler,
) -> Result<(), QueueError>
where
    S: futures::Stream<Item = (SubscribeHeaders, String)> + Unpin,
{
    tokio::select! {
        _ = ctx.cancelled() => {
            debug!("NATS subscription cancelled");
            Ok(())
        }
        message = messages.next() => match message {
            Some((headers, body)) => {
                handler(headers, body).map_err(|e| QueueError::Handler(e.to_string()))
            }
            None => Err(QueueError::Closed),
        }
    }
}

fn nats_headers(headers: Option<&HeaderMap>) -> SubscribeHeaders {
    let Some(headers) = headers else {
        return SubscribeHeaders::new();
    };

    headers
        .iter()
        .map(|(name, values)| {
            (
                name.to_string(),
                values.iter().map(|value| value.as_str().to_string()).collect(),
            )
        })
        .collect()
}
