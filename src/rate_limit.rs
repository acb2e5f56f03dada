use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::http::HeaderMap;

/// In-memory sliding-window limiter keyed by client identifier.
///
/// Each key keeps the instants of its accepted calls inside the window.
/// Memory is bounded crudely: when more than `max_tracked` distinct keys are
/// stored, the whole map is cleared. Counters are process-local.
pub struct RateLimiter {
    window: Duration,
    max_tracked: usize,
    hits: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_tracked: usize) -> Self {
        Self {
            window,
            max_tracked,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if the call is allowed, `false` if `token` already made
    /// `limit` calls within the window.
    pub fn check(&self, token: &str, limit: usize) -> bool {
        self.check_at(token, limit, Instant::now())
    }

    /// Same as [`RateLimiter::check`] with an explicit clock.
    pub fn check_at(&self, token: &str, limit: usize, now: Instant) -> bool {
        let mut hits = self.hits.lock().unwrap_or_else(|e| e.into_inner());

        if hits.len() > self.max_tracked {
            tracing::warn!(
                tracked = hits.len(),
                "Rate limiter store exceeded its ceiling, clearing all counters"
            );
            hits.clear();
        }

        let window = self.window;
        let timestamps = hits.entry(token.to_string()).or_default();
        timestamps.retain(|t| now.saturating_duration_since(*t) < window);

        if timestamps.len() >= limit {
            return false;
        }

        timestamps.push(now);
        true
    }

    /// Number of distinct keys currently stored.
    pub fn tracked_clients(&self) -> usize {
        self.hits.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Best-effort client identifier taken from proxy headers.
pub fn client_identifier(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or("anonymous")
        .to_string()
}
