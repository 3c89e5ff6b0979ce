// Middleware — per-IP rate limiting
//
// Every generation endpoint fans out to a paid upstream call, so the
// limiter sits in front of the whole API. Token bucket per source IP,
// proxy-aware via X-Forwarded-For.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Shared rate limiter state — clone freely (it's an Arc inside)
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<RateLimiterInner>,
}

struct RateLimiterInner {
    buckets: DashMap<IpAddr, Bucket>,
    /// Burst capacity per IP
    capacity: f64,
    /// Tokens added per second (sustained rate)
    refill_rate: f64,
}

impl RateLimiter {
    pub fn new(requests_per_second: f64, burst: f64) -> Self {
        Self {
            inner: Arc::new(RateLimiterInner {
                buckets: DashMap::new(),
                capacity: burst,
                refill_rate: requests_per_second,
            }),
        }
    }

    /// Returns true if the request from `ip` is within rate limits.
    /// Consumes one token.
    pub fn check(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut bucket = self.inner.buckets.entry(ip).or_insert_with(|| Bucket {
            tokens: self.inner.capacity,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.inner.refill_rate).min(self.inner.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Purge buckets idle for more than `idle_secs`; call periodically.
    pub fn purge_idle(&self, idle_secs: u64) {
        let cutoff = Duration::from_secs(idle_secs);
        let now = Instant::now();
        self.inner
            .buckets
            .retain(|_, bucket| now.duration_since(bucket.last_refill) < cutoff);
    }

    #[cfg(test)]
    fn tracked_ips(&self) -> usize {
        self.inner.buckets.len()
    }
}

/// Axum middleware enforcing the per-IP limit. The limiter is injected as
/// an extension; when absent, requests pass (the middleware degrades
/// rather than crashing an unwired router).
pub async fn rate_limit_middleware(
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(limiter) = request.extensions().get::<RateLimiter>().cloned() else {
        return Ok(next.run(request).await);
    };

    let ip = extract_ip(&request).unwrap_or(IpAddr::from([127, 0, 0, 1]));

    if limiter.check(ip) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(%ip, "rate limit exceeded");
        Err(StatusCode::TOO_MANY_REQUESTS)
    }
}

/// Source IP, preferring X-Forwarded-For for reverse-proxy setups.
fn extract_ip(request: &Request<Body>) -> Option<IpAddr> {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|first| first.trim().parse().ok())
}
