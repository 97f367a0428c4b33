use std::sync::{Arc, Mutex};

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::time::Instant;

pub const RATE_LIMIT_MESSAGE: &str = "😥 Wow, so many bugs. 🐜";

/// Process-wide token bucket. The configured requests-per-minute limit is
/// converted to a per-second refill rate; bucket capacity is at least one
/// token so a low limit still admits the first request.
///
/// Time is read from `tokio::time::Instant`, which makes the refill window
/// controllable in tests with paused time.
pub struct RateLimiter {
    capacity: f64,
    refill_per_sec: f64,
    bucket: Mutex<Bucket>,
}

struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

impl RateLimiter {
    pub fn per_minute(requests_per_minute: u64) -> Self {
        let refill_per_sec = requests_per_minute as f64 / 60.0;
        let capacity = refill_per_sec.max(1.0);

        Self {
            capacity,
            refill_per_sec,
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                refilled_at: Instant::now(),
            }),
        }
    }

    /// Take one token if available.
    pub fn try_acquire(&self) -> bool {
        let mut bucket = self.bucket.lock().expect("rate limiter lock poisoned");

        let now = Instant::now();
        let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.refilled_at = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    if limiter.try_acquire() {
        next.run(request).await
    } else {
        (StatusCode::TOO_MANY_REQUESTS, RATE_LIMIT_MESSAGE).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, Duration};

    #[tokio::test(start_paused = true)]
    async fn one_per_minute_admits_a_single_request_per_window() {
        let limiter = RateLimiter::per_minute(1);

        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        // Still inside the window
        advance(Duration::from_secs(30)).await;
        assert!(!limiter.try_acquire());

        // Window has refilled a full token
        advance(Duration::from_secs(31)).await;
        assert!(limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn tokens_cap_at_capacity() {
        let limiter = RateLimiter::per_minute(1);

        // A long idle period must not bank more than one token.
        advance(Duration::from_secs(600)).await;
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn higher_limits_refill_faster() {
        let limiter = RateLimiter::per_minute(60);

        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        advance(Duration::from_secs(1)).await;
        assert!(limiter.try_acquire());
    }
}
