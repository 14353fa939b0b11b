//! Request gate for bearer authentication
//!
//! Runs on every request. Paths under a public prefix pass straight through;
//! everything else must carry a valid `Authorization: Bearer <token>` header.
//! The decoded [`IdentityClaim`] is stored in the request extensions.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::core::auth::jwt::{IdentityClaim, JwtError, JwtService, extract_from_header};
use crate::core::response::ApiError;

/// Paths outside the API prefix that never require a token
pub const PUBLIC_PATHS: [&str; 2] = ["/docs", "/health"];

#[derive(Clone)]
pub struct AuthGateState {
    pub jwt_service: JwtService,
    pub public_prefixes: Arc<Vec<String>>,
}

impl AuthGateState {
    /// Gate with `{api_prefix}/auth` and the fixed public paths open
    pub fn new(jwt_service: JwtService, api_prefix: &str) -> Self {
        let mut public_prefixes = vec![format!("{}/auth", api_prefix.trim_end_matches('/'))];
        public_prefixes.extend(PUBLIC_PATHS.iter().map(|p| p.to_string()));

        Self {
            jwt_service,
            public_prefixes: Arc::new(public_prefixes),
        }
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Resolve an optional raw header value into an identity
    pub fn authenticate(&self, header: Option<&str>) -> Result<IdentityClaim, JwtError> {
        let token = extract_from_header(header)?;
        self.jwt_service.verify(token)
    }
}

/// Axum middleware enforcing the gate
pub async fn require_auth(
    State(state): State<AuthGateState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.is_public(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let header = match req.headers().get(header::AUTHORIZATION) {
        None => None,
        // A header that is not valid UTF-8 is treated as malformed
        Some(value) => Some(value.to_str().unwrap_or_default()),
    };

    let claim = state.authenticate(header).map_err(|err| {
        tracing::debug!("Rejected {} {}: {}", req.method(), req.uri().path(), err);
        match err {
            JwtError::MissingHeader => ApiError::unauthorized("Authorization header is required"),
            _ => ApiError::unauthorized("Unauthorized - Invalid or missing token"),
        }
    })?;

    req.extensions_mut().insert(claim);
    Ok(next.run(req).await)
}
