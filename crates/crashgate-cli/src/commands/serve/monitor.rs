use std::sync::Arc;

use crashgate_core::{Event, Queue, SubscribeHandler};
use crashgate_dispatch::EVENTS_TOPIC;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Long-running receive loop for broadcast backends: subscribes to the
/// events topic on the shared queue handle and logs each delivery. Ends
/// when the shutdown token is cancelled or the channel closes.
pub fn spawn_event_monitor(queue: Arc<dyn Queue>, shutdown: CancellationToken) {
    tokio::spawn(async move {
        let handler: SubscribeHandler = Box::new(|_headers, body| {
            match serde_json::from_str::<Event>(&body) {
                Ok(event) => debug!("📨 Event delivered downstream: {}", event.id),
                Err(_) => debug!("📨 Non-event payload delivered on the events topic"),
            }

            Ok(())
        });

        if let Err(e) = queue.subscribe(&shutdown, EVENTS_TOPIC, handler).await {
            error!("Event monitor subscription ended: {}", e);
        }
    });
}
