//! Authentication module for usergate
//!
//! This module provides authentication functionality including:
//! - JWT token generation and validation
//! - User registration and login
//! - The request gate protecting non-public routes

pub mod api;
pub mod gate;
pub mod jwt;
pub mod service;

pub use api::{AuthApiState, auth_api_router};
pub use gate::{AuthGateState, require_auth};
pub use jwt::{Claims, IdentityClaim, JwtConfig, JwtError, JwtService};
pub use service::{AuthError, AuthResponse, AuthService, LoginRequest, RegisterRequest};
