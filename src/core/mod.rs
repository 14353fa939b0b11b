//! Core domain: authentication, users, storage and the HTTP plumbing around them

pub mod auth;
pub mod config;
pub mod db;
pub mod extract;
pub mod response;
pub mod security;
pub mod users;
pub mod validation;

#[cfg(test)]
mod tests;
