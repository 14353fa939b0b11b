//! Authentication service
//!
//! Provides business logic for user registration and login.
//! Coordinates between the user service and the JWT service.

use serde::Serialize;
use serde_json::Value;

use crate::core::auth::jwt::{IdentityClaim, JwtError, JwtService};
use crate::core::db::models::{User, UserResponse};
use crate::core::users::service::{UserService, UserServiceError};
use crate::core::validation::{Length, ObjectValidator, Schema, ValidationFailure};

/// Authentication service error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User with this email already exists")]
    EmailAlreadyExists,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<UserServiceError> for AuthError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::EmailAlreadyExists => AuthError::EmailAlreadyExists,
            _ => AuthError::InternalError(err.to_string()),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        AuthError::InternalError(err.to_string())
    }
}

/// Registration request data
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Schema for RegisterRequest {
    fn parse(value: &Value) -> Result<Self, ValidationFailure> {
        let mut fields = ObjectValidator::new(value, "body")?;
        let name = fields.string("name", Length::between(2, 50));
        let email = fields.email("email");
        let password = fields.string("password", Length::at_least(6));

        let parsed = match (name, email, password) {
            (Some(name), Some(email), Some(password)) => Some(Self {
                name,
                email,
                password,
            }),
            _ => None,
        };
        fields.finish(parsed)
    }
}

/// Login request data
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Schema for LoginRequest {
    fn parse(value: &Value) -> Result<Self, ValidationFailure> {
        let mut fields = ObjectValidator::new(value, "body")?;
        let email = fields.email("email");
        let password = fields.string("password", Length::at_least(1));

        let parsed = email
            .zip(password)
            .map(|(email, password)| Self { email, password });
        fields.finish(parsed)
    }
}

/// Authentication response with user data and token
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    user_service: UserService,
    jwt_service: JwtService,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(user_service: UserService, jwt_service: JwtService) -> Self {
        Self {
            user_service,
            jwt_service,
        }
    }

    fn respond(&self, user: User) -> Result<AuthResponse, AuthError> {
        let claim = IdentityClaim::new(user.id.to_string(), user.email.clone());
        let token = self.jwt_service.issue(&claim)?;

        Ok(AuthResponse {
            user: UserResponse::summary(user),
            token,
        })
    }

    /// Register a new user
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AuthError> {
        let user = self
            .user_service
            .create_user(&request.name, &request.email, &request.password)
            .await?;

        self.respond(user)
    }

    /// Login an existing user
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let user = self
            .user_service
            .validate_user_credentials(&request.email, &request.password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        self.respond(user)
    }
}
