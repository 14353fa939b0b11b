//! usergate - user management REST API
//!
//! Registration and login with bearer tokens, plus authenticated CRUD over
//! user records, built on axum with PostgreSQL or in-memory storage.

pub mod app;
pub mod core;
