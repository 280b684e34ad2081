//! Per-route fixed-window rate limiting
//!
//! Each rate-limited route owns a [`RateLimiter`] keyed by client IP: N
//! requests per 60-second window, with the window anchored at the first
//! request that opens it. The limiter runs before validation and handlers,
//! so an over-limit caller learns nothing about payload correctness.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::types::AppError;

/// Default rate-limit window length
pub const WINDOW_SECS: i64 = 60;

/// Stale buckets are pruned once the map grows past this many keys
const PRUNE_THRESHOLD: usize = 10_000;

/// Configuration for one route's limiter
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Requests allowed per window
    pub max_requests: u32,
    /// Window length in seconds
    pub window_secs: i64,
}

impl RateLimitConfig {
    /// A limiter over the default 60-second window
    #[must_use]
    pub const fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            window_secs: WINDOW_SECS,
        }
    }
}

/// Outcome of a limiter check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request admitted; `remaining` may be used for response headers
    Allowed {
        /// Requests left in the current window
        remaining: u32,
    },
    /// Request rejected for this window
    Limited,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: i64,
    count: u32,
}

/// Fixed-window counter keyed by client IP
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    /// Creates a limiter with the given config
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Checks and counts one request for `key` at time `now`.
    ///
    /// # Panics
    ///
    /// Panics if the bucket mutex is poisoned
    pub fn check(&self, key: &str, now: i64) -> RateLimitResult {
        let mut buckets = self.buckets.lock().expect("rate limit mutex poisoned");

        if buckets.len() > PRUNE_THRESHOLD {
            buckets.retain(|_, window| now - window.started_at < self.config.window_secs);
        }

        let window = buckets.entry(key.to_string()).or_insert(Window {
            started_at: now,
            count: 0,
        });

        if now - window.started_at >= self.config.window_secs {
            window.started_at = now;
            window.count = 0;
        }

        if window.count >= self.config.max_requests {
            return RateLimitResult::Limited;
        }

        window.count += 1;
        RateLimitResult::Allowed {
            remaining: self.config.max_requests - window.count,
        }
    }
}

/// Resolves the client key for a request: the first `x-forwarded-for` hop
/// when present (the service runs behind a load balancer), otherwise the
/// peer address.
fn client_key(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return forwarded.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |info| info.0.ip().to_string())
}

/// Axum middleware enforcing a route's rate limit
///
/// # Errors
///
/// Returns a structured 429 when the caller's window is exhausted
pub async fn enforce_rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = client_key(&request);

    match limiter.check(&key, Utc::now().timestamp()) {
        RateLimitResult::Allowed { .. } => Ok(next.run(request).await),
        RateLimitResult::Limited => {
            tracing::warn!("Rate limit exceeded for {key}");
            Err(AppError::new(
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limit_exceeded",
                "Too many requests, please try again later",
                true,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn admits_up_to_the_bound_then_rejects() {
        let limiter = RateLimiter::new(RateLimitConfig::per_minute(5));

        for used in 1..=5 {
            assert_eq!(
                limiter.check("10.0.0.1", NOW),
                RateLimitResult::Allowed { remaining: 5 - used }
            );
        }
        assert_eq!(limiter.check("10.0.0.1", NOW + 30), RateLimitResult::Limited);
    }

    #[test]
    fn keys_are_isolated() {
        let limiter = RateLimiter::new(RateLimitConfig::per_minute(1));

        assert!(matches!(
            limiter.check("10.0.0.1", NOW),
            RateLimitResult::Allowed { .. }
        ));
        assert_eq!(limiter.check("10.0.0.1", NOW), RateLimitResult::Limited);
        assert!(matches!(
            limiter.check("10.0.0.2", NOW),
            RateLimitResult::Allowed { .. }
        ));
    }

    #[test]
    fn the_window_resets_after_it_elapses() {
        let limiter = RateLimiter::new(RateLimitConfig::per_minute(2));

        assert!(matches!(
            limiter.check("10.0.0.1", NOW),
            RateLimitResult::Allowed { .. }
        ));
        assert!(matches!(
            limiter.check("10.0.0.1", NOW + 10),
            RateLimitResult::Allowed { .. }
        ));
        assert_eq!(limiter.check("10.0.0.1", NOW + 59), RateLimitResult::Limited);

        // A fresh window opens at the anchor + 60s
        assert_eq!(
            limiter.check("10.0.0.1", NOW + 60),
            RateLimitResult::Allowed { remaining: 1 }
        );
    }
}
