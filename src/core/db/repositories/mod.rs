//! Database repositories for usergate
//!
//! Repositories encapsulate data access logic and provide a clean API for
//! business logic to interact with storage.

pub mod memory;
pub mod user;

pub use memory::InMemoryUserStore;
pub use user::{Page, PgUserStore, UserRepositoryError, UserStore};
