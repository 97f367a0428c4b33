use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::handlers::{health_check, no_route};
use crate::limiter::{rate_limit_middleware, RateLimiter};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind HTTP listener: {0}")]
    Bind(std::io::Error),

    #[error("HTTP server failed: {0}")]
    Serve(std::io::Error),
}

/// Assemble the gateway router: health check, catch-all 404, request
/// logging, optional rate limiting and allow-any CORS on every response.
pub fn build_router(rate_limit_per_minute: u64) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    let mut router = Router::new()
        .route("/health", get(health_check))
        .fallback(no_route);

    if rate_limit_per_minute == 0 {
        warn!("💡 Rate limit middleware is disabled");
    } else {
        let limiter = Arc::new(RateLimiter::per_minute(rate_limit_per_minute));
        router = router.layer(middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        ));
    }

    // CORS is outermost so its headers also reach 404 and 429 responses.
    router
        .layer(middleware::from_fn(request_log_middleware))
        .layer(cors)
}

async fn request_log_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    info!("{} {} {}", method, path, response.status().as_u16());

    response
}

/// Bind the listener and serve until `shutdown` is cancelled. After the
/// signal, in-flight requests get up to `grace` to complete before the
/// server is forced down. The queue handle is closed by the caller once
/// this returns.
pub async fn serve(
    address: &str,
    router: Router,
    shutdown: CancellationToken,
    grace: Duration,
) -> Result<(), ServerError> {
    let listener = TcpListener::bind(address).await.map_err(ServerError::Bind)?;

    info!("🐛 Crashgate server listening at {}...", address);

    let drain = shutdown.clone();
    let graceful = axum::serve(listener, router)
        .with_graceful_shutdown(async move { drain.cancelled().await })
        .into_future();

    tokio::select! {
        result = graceful => result.map_err(ServerError::Serve)?,
        _ = async {
            shutdown.cancelled().await;
            tokio::time::sleep(grace).await;
        } => {
            warn!("⚠️ Shutdown grace period elapsed, forcing HTTP server to close");
        }
    }

    info!("❎ The crashgate server exited properly");

    Ok(())
}
