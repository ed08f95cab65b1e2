//! Rate limiting middleware.
//!
//! Fixed-window, per-client-IP request counting. Used on the login route.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::header::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::RwLock;

use crate::api::client_ip::peer_ip;
use crate::error::AppError;

/// Tracked keys above which expired windows are pruned on the next check.
const PRUNE_THRESHOLD: usize = 10_000;

/// Rate limiter that tracks requests per key.
#[derive(Debug)]
pub struct RateLimiter {
    /// Map of key -> (request count, window start time)
    requests: RwLock<HashMap<String, (u32, Instant)>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            requests: RwLock::new(HashMap::new()),
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    /// `Ok(remaining)` if allowed, `Err(retry_after_secs)` once the window
    /// is used up.
    pub async fn check_rate_limit(&self, key: &str) -> Result<u32, u64> {
        let now = Instant::now();
        let mut requests = self.requests.write().await;

        if requests.len() > PRUNE_THRESHOLD {
            let window = self.window;
            requests.retain(|_, (_, start)| now.duration_since(*start) < window);
        }

        let entry = requests.entry(key.to_string()).or_insert((0, now));

        if now.duration_since(entry.1) >= self.window {
            entry.0 = 1;
            entry.1 = now;
            return Ok(self.max_requests.saturating_sub(1));
        }

        if entry.0 >= self.max_requests {
            let elapsed = now.duration_since(entry.1).as_secs();
            return Err(self.window.as_secs().saturating_sub(elapsed).max(1));
        }

        entry.0 += 1;
        Ok(self.max_requests.saturating_sub(entry.0))
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }
}

/// Rate limiting middleware keyed on the TCP peer address.
///
/// Proxy headers are not consulted; requests without connection info share
/// one bucket.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let key = format!("ip:{}", peer_ip(request.extensions()));

    match limiter.check_rate_limit(&key).await {
        Ok(remaining) => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert("X-RateLimit-Limit", HeaderValue::from(limiter.max_requests()));
            headers.insert("X-RateLimit-Remaining", HeaderValue::from(remaining));
            response
        }
        Err(retry_after) => {
            tracing::warn!(key = %key, retry_after, "Rate limit exceeded");
            let mut response = AppError::RateLimited(retry_after).into_response();
            response
                .headers_mut()
                .insert("X-RateLimit-Limit", HeaderValue::from(limiter.max_requests()));
            response
                .headers_mut()
                .insert("X-RateLimit-Remaining", HeaderValue::from(0u32));
            response
        }
    }
}
