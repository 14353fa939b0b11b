//! User management: service layer and REST endpoints

pub mod api;
pub mod service;

pub use api::{UsersApiState, users_api_router};
pub use service::{UserPage, UserService, UserServiceError};
