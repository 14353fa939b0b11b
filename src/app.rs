//! Application router
//!
//! Wires the services by constructor and stacks the HTTP layers:
//! tracing, security headers, CORS, compression, rate limiting, panic
//! recovery, body limit and the auth gate (outermost first).

use std::any::Any;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{Method, StatusCode, Uri, header},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::core::auth::{
    AuthApiState, AuthGateState, AuthService, JwtConfig, JwtService, auth_api_router,
    require_auth,
};
use crate::core::config::{Config, SecurityConfig};
use crate::core::db::UserStore;
use crate::core::response::ApiError;
use crate::core::security::apply_security_layers;
use crate::core::users::{UserService, UsersApiState, users_api_router};

/// Body of `GET /health`
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: String,
}

/// Normalise the configured prefix to `""` or `/segment[/segment]`
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// Build the full application router on top of `store`
pub fn build_router(config: &Config, store: Arc<dyn UserStore>) -> Router {
    let prefix = normalize_prefix(&config.api_prefix);

    let jwt_service =
        JwtService::new(JwtConfig::new(config.jwt_secret.clone()).expiration(config.jwt_expiry_secs));
    let user_service = UserService::new(store).bcrypt_cost(config.bcrypt_cost);
    let auth_service = AuthService::new(user_service.clone(), jwt_service.clone());

    let api = Router::new()
        .merge(auth_api_router(AuthApiState { auth_service }))
        .merge(users_api_router(UsersApiState { user_service }));

    let router = if prefix.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(&prefix, api)
    };

    let gate = AuthGateState::new(jwt_service, &prefix);

    let router = router
        .route("/health", get(health_handler))
        .fallback(route_not_found)
        .layer(middleware::map_response(method_not_allowed))
        .layer(middleware::from_fn_with_state(gate, require_auth))
        .layer(DefaultBodyLimit::max(config.security.max_request_size));

    wrap_outer_layers(router, &config.security)
}

// Panics are caught inside the security layers so the 500 still carries
// the hardening and rate-limit headers.
fn wrap_outer_layers(router: Router, security: &SecurityConfig) -> Router {
    let router = router.layer(CatchPanicLayer::custom(handle_panic));
    apply_security_layers(router, security).layer(TraceLayer::new_for_http())
}

/// GET /health
async fn health_handler() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

async fn route_not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::not_found(format!("Route {}:{} not found", method, uri.path()))
}

// Routing answers an unsupported method with an empty 405; give it the envelope.
async fn method_not_allowed(response: Response) -> Response {
    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }

    let allow = response.headers().get(header::ALLOW).cloned();
    let mut envelope = ApiError::from_status(StatusCode::METHOD_NOT_ALLOWED).into_response();
    if let Some(allow) = allow {
        envelope.headers_mut().insert(header::ALLOW, allow);
    }
    envelope
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!("Request handler panicked: {}", detail);

    ApiError::internal().into_response()
}
