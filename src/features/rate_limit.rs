//! Fixed-window per-IP rate limiting for the HTTP surface.
//!
//! Three tiers: a general limit across all endpoints, a tighter one on the
//! scraping endpoint, and a tight hourly one on batch. Exceeding any tier
//! returns 429 with a `retry_after` hint in seconds.

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::warn;

struct Window {
    started: Instant,
    count: u32,
}

/// One rate-limit tier. Windows are per client IP and reset wholesale when
/// they expire; no sliding behavior.
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    error_label: &'static str,
    message: &'static str,
    windows: Mutex<HashMap<IpAddr, Window>>,
}

impl RateLimiter {
    pub fn new(
        window: Duration,
        max_requests: u32,
        error_label: &'static str,
        message: &'static str,
    ) -> Arc<Self> {
        Arc::new(Self {
            window,
            max_requests,
            error_label,
            message,
            windows: Mutex::new(HashMap::new()),
        })
    }

    /// 100 requests per 15 minutes, all endpoints.
    pub fn general() -> Arc<Self> {
        Self::new(
            Duration::from_secs(15 * 60),
            100,
            "Rate limit exceeded",
            "Too many requests from this IP, please try again later.",
        )
    }

    /// 20 requests per 15 minutes on the scraping endpoint.
    pub fn scraping() -> Arc<Self> {
        Self::new(
            Duration::from_secs(15 * 60),
            20,
            "Scraping rate limit exceeded",
            "Too many scraping requests from this IP. Please try again later.",
        )
    }

    /// 5 requests per hour on the batch endpoint.
    pub fn batch() -> Arc<Self> {
        Self::new(
            Duration::from_secs(60 * 60),
            5,
            "Batch rate limit exceeded",
            "Too many batch requests from this IP. Please try again later.",
        )
    }

    /// Record a hit for `ip`. `Err` carries the seconds until the window
    /// resets.
    pub fn check(&self, ip: IpAddr) -> Result<(), u64> {
        let mut windows = self.windows.lock().expect("rate limiter lock poisoned");
        let now = Instant::now();
        let entry = windows.entry(ip).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.max_requests {
            let retry_after = self
                .window
                .saturating_sub(now.duration_since(entry.started))
                .as_secs();
            return Err(retry_after.max(1));
        }

        entry.count += 1;
        Ok(())
    }
}

/// Axum middleware enforcing one tier. Attach per route group with
/// `middleware::from_fn_with_state`.
pub async fn enforce(
    State(limiter): State<Arc<RateLimiter>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    match limiter.check(addr.ip()) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            warn!(
                "{} for {} (retry in {}s)",
                limiter.error_label,
                addr.ip(),
                retry_after
            );
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({
                    "success": false,
                    "error": limiter.error_label,
                    "message": limiter.message,
                    "retry_after": retry_after,
                })),
            )
                .into_response()
        }
    }
}
