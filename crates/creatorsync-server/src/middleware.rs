use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

const API_KEYS_VAR: &str = "CREATORSYNC_API_KEYS";

/// Request id carried in the request extensions and echoed back in the
/// `x-request-id` response header.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[derive(Debug, Clone)]
pub struct AuthState {
    api_keys: Arc<Vec<String>>,
    pub enabled: bool,
}

impl AuthState {
    /// Reads bearer tokens from `CREATORSYNC_API_KEYS`.
    ///
    /// Without keys, development runs unauthenticated and every other
    /// environment refuses to start.
    ///
    /// # Errors
    ///
    /// Returns an error outside development when no key is configured.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        Self::from_keys(&std::env::var(API_KEYS_VAR).unwrap_or_default(), is_development)
    }

    pub(crate) fn from_keys(raw: &str, is_development: bool) -> anyhow::Result<Self> {
        let keys: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(ToOwned::to_owned)
            .collect();

        if keys.is_empty() {
            anyhow::ensure!(
                is_development,
                "{API_KEYS_VAR} must list at least one bearer token outside development"
            );
            tracing::warn!("{API_KEYS_VAR} not set; API auth disabled for development");
            return Ok(Self {
                api_keys: Arc::new(keys),
                enabled: false,
            });
        }

        Ok(Self {
            api_keys: Arc::new(keys),
            enabled: true,
        })
    }

    /// Compares against every key in constant time per key.
    fn allows(&self, token: &str) -> bool {
        self.api_keys
            .iter()
            .fold(false, |found, key| {
                found | bool::from(key.as_bytes().ct_eq(token.as_bytes()))
            })
    }
}

#[derive(Debug)]
struct Window {
    started_at: Instant,
    count: usize,
}

/// Fixed-window request limit shared by every protected route.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<Window>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(Window {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self::new(120, Duration::from_secs(60))
    }
}

#[derive(Debug, Serialize)]
struct RejectionBody {
    error: Rejection,
}

#[derive(Debug, Serialize)]
struct Rejection {
    code: &'static str,
    message: &'static str,
}

fn reject(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    (
        status,
        Json(RejectionBody {
            error: Rejection { code, message },
        }),
    )
        .into_response()
}

pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));
    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }
    res
}

pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    match bearer_token(req.headers().get(AUTHORIZATION)) {
        Some(token) if auth.allows(token) => next.run(req).await,
        _ => reject(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid bearer token",
        ),
    }
}

pub async fn enforce_rate_limit(
    State(limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let mut window = limit.state.lock().await;
    if window.started_at.elapsed() >= limit.window {
        window.started_at = Instant::now();
        window.count = 0;
    }
    if window.count >= limit.max_requests {
        return reject(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "rate limit exceeded",
        );
    }
    window.count += 1;
    drop(window);

    next.run(req).await
}

fn bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
