use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Process configuration, constructed once at startup from CLI flags and
/// environment fallbacks, then threaded into component constructors.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address the HTTP surface binds to.
    pub address: String,
    /// Requests per minute allowed by the rate limiter; 0 disables it.
    pub rate_limit_per_minute: u64,
    /// Queue connection URL; the scheme selects the backend.
    pub queue_url: String,
    /// Path to the services config file.
    pub config_file: PathBuf,
    /// Attribute/tag keys whose values are redacted before dispatch.
    pub sensitive_keys: HashSet<String>,
    /// How long in-flight HTTP requests may run after a shutdown signal.
    pub shutdown_grace: Duration,
}
