//! HTTP hardening: per-client rate limiting, CORS, compression and
//! response security headers.
//!
//! The rate limiter uses a fixed window per client key. Every response carries
//! `x-ratelimit-limit`, `x-ratelimit-remaining` and `x-ratelimit-reset`; a
//! client over the limit gets a 429 envelope with `Retry-After`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Router,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
};

use crate::core::config::SecurityConfig;
use crate::core::response::ApiError;

/// Tracked clients above which expired windows are swept
const PRUNE_THRESHOLD: usize = 10_000;

/// CORS preflight cache lifetime
const CORS_MAX_AGE: Duration = Duration::from_secs(86_400);

const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; style-src 'self' 'unsafe-inline'; \
script-src 'self'; img-src 'self' data: https:; connect-src 'self'; font-src 'self'; \
object-src 'none'; media-src 'self'; frame-src 'none'";

const STRICT_TRANSPORT_SECURITY: &str = "max-age=31536000; includeSubDomains; preload";

const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

// ============================================================================
// Rate limiting
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of counting one request against a client's window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the current window closes
    pub reset_after: Duration,
}

impl RateDecision {
    /// Whole seconds until reset, rounded up
    pub fn reset_secs(&self) -> u64 {
        self.reset_after.as_secs_f64().ceil() as u64
    }

    fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(X_RATELIMIT_RESET, HeaderValue::from(self.reset_secs()));
    }
}

/// Fixed-window request counter keyed by client
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Arc<DashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Arc::new(DashMap::new()),
        }
    }

    pub fn from_config(security: &SecurityConfig) -> Self {
        Self::new(
            security.rate_limit_max,
            Duration::from_secs(security.rate_limit_window_minutes.saturating_mul(60)),
        )
    }

    pub fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    /// Count a request from `key` at `now`
    pub fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert(Window {
                started: now,
                count: 0,
            });

        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }
        entry.count = entry.count.saturating_add(1);

        RateDecision {
            allowed: entry.count <= self.max_requests,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(entry.count),
            reset_after: self.window.saturating_sub(now.duration_since(entry.started)),
        }
    }

    /// Drop windows that have already closed
    pub fn prune(&self, now: Instant) {
        let window = self.window;
        self.windows
            .retain(|_, entry| now.duration_since(entry.started) < window);
    }

    /// Number of tracked clients
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Key identifying the caller: peer address, then the first
/// `X-Forwarded-For` entry, then `"unknown"`
pub fn client_key(req: &Request) -> String {
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    req.headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}

/// Axum middleware counting every request against its client's window
pub async fn rate_limit(State(limiter): State<RateLimiter>, req: Request, next: Next) -> Response {
    let key = client_key(&req);
    let decision = limiter.check(&key);

    if limiter.len() > PRUNE_THRESHOLD {
        limiter.prune(Instant::now());
    }

    if !decision.allowed {
        let retry_in = decision.reset_after.as_secs_f64().round() as u64;
        tracing::warn!("Rate limit exceeded for client {}", key);

        let mut response = ApiError::too_many_requests(format!(
            "Rate limit exceeded, retry in {} seconds",
            retry_in
        ))
        .into_response();
        decision.apply_headers(response.headers_mut());
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(decision.reset_secs()));
        return response;
    }

    let mut response = next.run(req).await;
    decision.apply_headers(response.headers_mut());
    response
}

// ============================================================================
// CORS, compression and headers
// ============================================================================

pub fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = security
        .allowed_origins
        .iter()
        .filter(|origin| {
            // A wildcard cannot be combined with credentials
            if origin.as_str() == "*" {
                tracing::warn!("Ignoring wildcard CORS origin");
                return false;
            }
            true
        })
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
            HeaderName::from_static("x-csrf-token"),
        ])
        .max_age(CORS_MAX_AGE)
}

/// Response headers added to every response; `helmet` adds CSP, HSTS and
/// frame options
pub fn security_headers(helmet: bool) -> Vec<(HeaderName, HeaderValue)> {
    let mut headers = vec![
        (
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ),
        (
            HeaderName::from_static("x-download-options"),
            HeaderValue::from_static("noopen"),
        ),
        (
            HeaderName::from_static("x-permitted-cross-domain-policies"),
            HeaderValue::from_static("none"),
        ),
        (
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ),
        (
            HeaderName::from_static("permissions-policy"),
            HeaderValue::from_static("camera=(), microphone=(), geolocation=()"),
        ),
    ];

    if helmet {
        headers.extend([
            (
                header::CONTENT_SECURITY_POLICY,
                HeaderValue::from_static(CONTENT_SECURITY_POLICY),
            ),
            (
                header::STRICT_TRANSPORT_SECURITY,
                HeaderValue::from_static(STRICT_TRANSPORT_SECURITY),
            ),
            (
                header::X_FRAME_OPTIONS,
                HeaderValue::from_static("SAMEORIGIN"),
            ),
        ]);
    }

    headers
}

/// Wrap `router` in the layers enabled by `security`.
///
/// Outermost first: headers, CORS, compression, rate limit.
pub fn apply_security_layers(mut router: Router, security: &SecurityConfig) -> Router {
    if security.enable_rate_limit {
        let limiter = RateLimiter::from_config(security);
        tracing::info!(
            "Rate limiting enabled: {} requests per {} minutes",
            security.rate_limit_max,
            security.rate_limit_window_minutes
        );
        router = router.layer(middleware::from_fn_with_state(limiter, rate_limit));
    }

    if security.enable_compress {
        router = router.layer(CompressionLayer::new().gzip(true).deflate(true));
    }

    if security.enable_cors {
        router = router.layer(cors_layer(security));
    }

    for (name, value) in security_headers(security.enable_helmet) {
        router = router.layer(SetResponseHeaderLayer::if_not_present(name, value));
    }

    router
}
