//! Fixed-window request limiting per tenant and client address.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::tenant::CurrentTenant;
use crate::AppState;

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

#[derive(Debug)]
pub struct RateLimiter {
    enabled: bool,
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            enabled: true,
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(u32::MAX, Duration::from_secs(1))
        }
    }

    pub fn from_config(api: &ApiConfig) -> Self {
        if api.enable_rate_limiting {
            Self::new(api.rate_limit_requests, Duration::from_secs(api.rate_limit_window_secs))
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub async fn check(&self, key: &str) -> RateLimitResult {
        self.check_at(key, Instant::now()).await
    }

    pub async fn check_at(&self, key: &str, now: Instant) -> RateLimitResult {
        if !self.enabled {
            return RateLimitResult::Allowed { remaining: u32::MAX };
        }

        let mut windows = self.windows.lock().await;
        // Drop stale windows so the map does not grow with every client ever seen
        windows.retain(|_, w| now.duration_since(w.started) < self.window);

        let entry = windows.entry(key.to_string()).or_insert(Window { started: now, count: 0 });
        if entry.count >= self.max_requests {
            return RateLimitResult::Limited {
                retry_after: self.window.saturating_sub(now.duration_since(entry.started)),
            };
        }

        entry.count += 1;
        RateLimitResult::Allowed {
            remaining: self.max_requests - entry.count,
        }
    }
}

fn client_address(headers: &HeaderMap, request: &Request) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    if let Some(address) = forwarded {
        return address.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rejects with 429 once a tenant/client pair exhausts its window.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if !state.limiter.is_enabled() {
        return next.run(request).await;
    }

    let tenant = request
        .extensions()
        .get::<CurrentTenant>()
        .map(|tenant| tenant.id().to_string())
        .unwrap_or_else(|| "-".to_string());
    let key = format!("{}:{}", tenant, client_address(&headers, &request));

    match state.limiter.check(&key).await {
        RateLimitResult::Allowed { .. } => next.run(request).await,
        RateLimitResult::Limited { retry_after } => {
            tracing::warn!("Rate limit exceeded for {}", key);
            ApiError::too_many_requests(format!(
                "Rate limit exceeded, retry in {}s",
                retry_after.as_secs().max(1)
            ))
            .into_response()
        }
    }
}
