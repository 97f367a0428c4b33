mod monitor;
mod shutdown;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use crashgate_config::GatewayConfig;
use crashgate_dispatch::EventDispatcher;
use crashgate_services::{ConfigServiceResolver, ServiceResolver};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Args)]
pub struct ServeCommand {
    /// Address to bind the HTTP surface to
    #[arg(long, default_value = "127.0.0.1:4000", env = "CRASHGATE_ADDRESS")]
    pub address: String,

    /// Path to the services config file
    #[arg(long, env = "CRASHGATE_CONFIG_FILE")]
    pub config_file: PathBuf,

    /// Queue connection URL; the scheme selects the backend
    /// (redis:// for broadcast, nats:// for request-stream)
    #[arg(long, env = "CRASHGATE_QUEUE_URL")]
    pub queue_url: String,

    /// Requests per minute allowed by the rate limiter; 0 disables it
    #[arg(long, default_value = "0", env = "CRASHGATE_RATE_LIMIT")]
    pub rate_limit: u64,

    /// Attribute/tag keys to redact from events, comma separated
    #[arg(
        long,
        env = "CRASHGATE_SCRUB_SENSITIVE_KEYS",
        value_delimiter = ',',
        default_value = ""
    )]
    pub sensitive_keys: Vec<String>,

    /// Seconds in-flight requests may run after a shutdown signal
    #[arg(long, default_value = "5", env = "CRASHGATE_SHUTDOWN_GRACE_SECS")]
    pub shutdown_grace_secs: u64,
}

impl ServeCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let config = GatewayConfig {
            address: self.address,
            rate_limit_per_minute: self.rate_limit,
            queue_url: self.queue_url,
            config_file: self.config_file,
            sensitive_keys: self
                .sensitive_keys
                .iter()
                .filter(|key| !key.is_empty())
                .cloned()
                .collect::<HashSet<String>>(),
            shutdown_grace: Duration::from_secs(self.shutdown_grace_secs),
        };

        let config_file = crashgate_config::load_config_file(&config.config_file)
            .map_err(|e| {
                anyhow::anyhow!(
                    "❌ The configuration file is in incorrect format or does not exist: {}",
                    e
                )
            })?;

        info!(
            "Loaded {} service(s) from {}",
            config_file.services.len(),
            config.config_file.display()
        );

        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(run(config, config_file))
    }
}

async fn run(
    config: GatewayConfig,
    config_file: crashgate_config::ConfigFile,
) -> anyhow::Result<()> {
    // A failed queue connection aborts startup; there is no retry.
    let queue = crashgate_queue::connect(&config.queue_url).await.map_err(|e| {
        anyhow::anyhow!(
            "❌ Something went wrong when trying to construct the queue connection: {}",
            e
        )
    })?;

    let shutdown = CancellationToken::new();

    // The pipeline the protocol front-end calls into: tenant resolution
    // and the dispatch ingress. The front-end runs as its own listener.
    let resolver: Arc<dyn ServiceResolver> =
        Arc::new(ConfigServiceResolver::new(config_file.services));
    let dispatcher = Arc::new(EventDispatcher::new(queue.clone(), shutdown.clone()));

    debug!(
        "Pipeline wired with {} sensitive key(s)",
        config.sensitive_keys.len()
    );

    // Broadcast backends get a long-running receive loop on the events
    // topic; the request-stream backend's single-shot subscribe is left to
    // downstream consumers.
    if config.queue_url.starts_with("redis") {
        monitor::spawn_event_monitor(queue.clone(), shutdown.clone());
    }

    tokio::spawn(shutdown::wait_for_signal(shutdown.clone()));

    let router = crashgate_web::build_router(config.rate_limit_per_minute);
    let serve_result =
        crashgate_web::serve(&config.address, router, shutdown.clone(), config.shutdown_grace)
            .await;

    // Release the pipeline's queue handles before closing the connection;
    // queue shutdown is ordered strictly after the HTTP listener finishes.
    drop(dispatcher);
    drop(resolver);

    if let Err(e) = queue.close().await {
        tracing::warn!("Queue connection did not close cleanly: {}", e);
    }

    serve_result?;

    Ok(())
}
