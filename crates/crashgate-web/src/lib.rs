//! HTTP surface of the gateway: health check, catch-all 404, CORS,
//! rate limiting and graceful shutdown.

pub mod handlers;
pub mod limiter;
pub mod server;

pub use handlers::*;
pub use limiter::{RateLimiter, RATE_LIMIT_MESSAGE};
pub use server::{build_router, serve, ServerError};
