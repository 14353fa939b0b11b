//! In-process user store
//!
//! Used when no `DATABASE_URL` is configured and by the router tests.
//! Records are kept in insertion order behind a tokio `RwLock`; email
//! uniqueness is checked under the write lock.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::user::{UserRepositoryError, UserStore};
use crate::core::db::models::{NewUser, User, UserChanges, UserId};

#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<Vec<User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| &u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_all(&self) -> Result<Vec<User>, UserRepositoryError> {
        Ok(self.users.read().await.clone())
    }

    async fn create(&self, user: NewUser) -> Result<User, UserRepositoryError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(UserRepositoryError::EmailAlreadyExists);
        }

        let now = Utc::now();
        let user = User {
            id: UserId::generate_at(now),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());

        Ok(user)
    }

    async fn update(
        &self,
        id: &UserId,
        changes: &UserChanges,
    ) -> Result<Option<User>, UserRepositoryError> {
        let mut users = self.users.write().await;

        if let Some(email) = &changes.email
            && users.iter().any(|u| &u.email == email && &u.id != id)
        {
            return Err(UserRepositoryError::EmailAlreadyExists);
        }

        let Some(user) = users.iter_mut().find(|u| &u.id == id) else {
            return Ok(None);
        };

        if let Some(name) = &changes.name {
            user.name = name.clone();
        }
        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError> {
        let mut users = self.users.write().await;
        let removed = users
            .iter()
            .position(|u| &u.id == id)
            .map(|index| users.remove(index));

        Ok(removed)
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, UserRepositoryError> {
        let users = self.users.read().await;
        Ok(users.iter().any(|u| u.email == email))
    }

    async fn exists_by_id(&self, id: &UserId) -> Result<bool, UserRepositoryError> {
        let users = self.users.read().await;
        Ok(users.iter().any(|u| &u.id == id))
    }

    async fn find_page(&self, offset: i64, limit: i64) -> Result<Vec<User>, UserRepositoryError> {
        let users = self.users.read().await;
        let offset = usize::try_from(offset).unwrap_or(0);
        let limit = usize::try_from(limit).unwrap_or(0);

        Ok(users.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn count(&self) -> Result<i64, UserRepositoryError> {
        Ok(self.users.read().await.len() as i64)
    }
}
