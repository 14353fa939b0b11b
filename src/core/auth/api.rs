//! Auth API endpoints
//!
//! Provides REST API endpoints for authentication:
//! - POST {prefix}/auth/register - Register a new user
//! - POST {prefix}/auth/login - Login and get a token

use axum::{Router, extract::State, routing::post};
use std::sync::Arc;

use crate::core::auth::{AuthError, AuthResponse, AuthService, LoginRequest, RegisterRequest};
use crate::core::extract::ValidatedJson;
use crate::core::response::{ApiError, ApiSuccess};

/// Auth API state containing the auth service
#[derive(Clone)]
pub struct AuthApiState {
    pub auth_service: AuthService,
}

/// Convert AuthError to API error
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::unauthorized(err.to_string()),
            AuthError::EmailAlreadyExists => ApiError::bad_request(err.to_string()),
            AuthError::InternalError(cause) => {
                tracing::error!("Auth request failed: {}", cause);
                ApiError::internal()
            }
        }
    }
}

/// Create the auth API router
pub fn auth_api_router(state: AuthApiState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .with_state(state)
}

/// POST /auth/register
/// Register a new user
async fn register_handler(
    State(state): State<Arc<AuthApiState>>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<ApiSuccess<AuthResponse>, ApiError> {
    tracing::debug!("Registration attempt");

    let response = state.auth_service.register(request).await?;

    tracing::info!("User registered: {}", response.user.id);

    Ok(ApiSuccess::created(response, "User registered successfully"))
}

/// POST /auth/login
/// Login and get a bearer token
async fn login_handler(
    State(state): State<Arc<AuthApiState>>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<ApiSuccess<AuthResponse>, ApiError> {
    tracing::debug!("Login attempt");

    let response = state.auth_service.login(request).await?;

    tracing::info!("User logged in: {}", response.user.id);

    Ok(ApiSuccess::ok(response, "Login successful"))
}
