//! Rate limiting middleware.
//!
//! Per-client limiting with a keyed GCRA limiter. A client is its session
//! cookie when it has one, otherwise the forwarded client address.

use std::num::NonZeroU32;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{
    clock::{Clock, DefaultClock},
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter,
};
use serde_json::json;

use crate::app::AppState;

type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

const ANONYMOUS: &str = "anonymous";

/// Rate limiter state shared across all requests.
pub struct RateLimiterState {
    limiter: KeyedLimiter,
    clock: DefaultClock,
    rate_limit_per_minute: u32,
}

impl RateLimiterState {
    /// Returns `None` when `rate_limit_per_minute` is 0 (limiting disabled).
    pub fn new(rate_limit_per_minute: u32) -> Option<Self> {
        let per_minute = NonZeroU32::new(rate_limit_per_minute)?;
        Some(Self {
            limiter: RateLimiter::keyed(Quota::per_minute(per_minute)),
            clock: DefaultClock::default(),
            rate_limit_per_minute,
        })
    }

    pub fn limit(&self) -> u32 {
        self.rate_limit_per_minute
    }

    /// Ok if allowed, or Err with retry-after seconds (at least 1).
    pub fn check(&self, key: &str) -> Result<(), u64> {
        self.limiter
            .check_key(&key.to_string())
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()).as_secs().max(1))
    }

    /// Drops state for clients that are back at full quota.
    pub fn prune(&self) -> usize {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        self.limiter.len()
    }
}

impl std::fmt::Debug for RateLimiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("tracked_clients", &self.limiter.len())
            .finish()
    }
}

/// Limiter key: `session:<id>`, `addr:<client address>` or `anonymous`.
pub fn client_key(headers: &HeaderMap, session_id: Option<&str>) -> String {
    if let Some(id) = session_id {
        return format!("session:{}", id);
    }

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match forwarded.or(real_ip) {
        Some(addr) => format!("addr:{}", addr),
        None => ANONYMOUS.to_string(),
    }
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(limiter) = state.rate_limiter.as_deref() else {
        return next.run(req).await;
    };

    let key = client_key(req.headers(), state.cookies.extract_session_id(req.headers()));
    if let Err(retry_after) = limiter.check(&key) {
        tracing::warn!(retry_after, "Rate limit exceeded");
        return rate_limited_response(limiter.limit(), retry_after);
    }

    next.run(req).await
}

fn rate_limited_response(limit: u32, retry_after: u64) -> Response {
    let body = json!({
        "error": "rate_limited",
        "message": format!("Rate limit of {} requests/minute exceeded", limit),
        "retryAfter": retry_after
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_when_zero() {
        assert!(RateLimiterState::new(0).is_none());
    }

    #[test]
    fn test_limits_per_key() {
        let state = RateLimiterState::new(2).unwrap();
        assert!(state.check("session:a").is_ok());
        assert!(state.check("session:a").is_ok());
        let retry = state.check("session:a").unwrap_err();
        assert!(retry >= 1);

        // Other clients keep their own quota.
        assert!(state.check("session:b").is_ok());
    }

    #[test]
    fn test_client_key() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_key(&headers, None), "anonymous");
        assert_eq!(client_key(&headers, Some("abc")), "session:abc");

        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(client_key(&headers, None), "addr:10.0.0.9");

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_key(&headers, None), "addr:203.0.113.7");
    }

    #[test]
    fn test_rate_limited_response() {
        let response = rate_limited_response(60, 5);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "5");
    }
}
