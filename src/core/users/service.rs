//! User service
//!
//! Business rules over the [`UserStore`]: email uniqueness checks, password
//! hashing and pagination bounds.

use std::sync::Arc;

use crate::core::config::DEFAULT_BCRYPT_COST;
use crate::core::db::models::{NewUser, User, UserChanges, UserId};
use crate::core::db::repositories::{UserRepositoryError, UserStore};

/// Page size used when the requested one is out of range
pub const DEFAULT_PAGE_LIMIT: i64 = 10;

/// Largest page size a caller may request
pub const MAX_PAGE_LIMIT: i64 = 100;

/// User service error types
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("User with this email already exists")]
    EmailAlreadyExists,

    #[error("Password hashing failed: {0}")]
    HashingError(String),

    #[error("Storage error: {0}")]
    Storage(UserRepositoryError),
}

impl From<UserRepositoryError> for UserServiceError {
    fn from(err: UserRepositoryError) -> Self {
        match err {
            UserRepositoryError::EmailAlreadyExists => UserServiceError::EmailAlreadyExists,
            other => UserServiceError::Storage(other),
        }
    }
}

/// Users for one page plus the effective paging values
#[derive(Debug, Clone)]
pub struct UserPage {
    pub users: Vec<User>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// Clamp `page` to at least 1 and fall back to the default limit when
/// `limit` is outside `1..=100`
pub fn effective_paging(page: i64, limit: i64) -> (i64, i64) {
    let page = page.max(1);
    let limit = if (1..=MAX_PAGE_LIMIT).contains(&limit) {
        limit
    } else {
        DEFAULT_PAGE_LIMIT
    };
    (page, limit)
}

/// User service
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    bcrypt_cost: u32,
}

impl UserService {
    /// Create a new user service
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self {
            store,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }

    /// Set bcrypt cost
    pub fn bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// Hash a password using bcrypt with automatic salt generation.
    ///
    /// Runs on the blocking thread pool.
    pub async fn hash_password(&self, password: &str) -> Result<String, UserServiceError> {
        let password = password.to_string();
        let cost = self.bcrypt_cost;

        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| UserServiceError::HashingError(e.to_string()))?
            .map_err(|e| UserServiceError::HashingError(e.to_string()))
    }

    /// Verify a password against a bcrypt hash on the blocking thread pool
    pub async fn verify_password(password: &str, hash: &str) -> Result<bool, UserServiceError> {
        let password = password.to_string();
        let hash = hash.to_string();

        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| UserServiceError::HashingError(e.to_string()))?
            .map_err(|e| UserServiceError::HashingError(e.to_string()))
    }

    /// Create a new user with a plain text password (will be hashed)
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, UserServiceError> {
        if self.store.exists_by_email(email).await? {
            return Err(UserServiceError::EmailAlreadyExists);
        }

        let password_hash = self.hash_password(password).await?;

        let user = self
            .store
            .create(NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash,
            })
            .await?;

        Ok(user)
    }

    pub async fn find_user_by_id(&self, id: &UserId) -> Result<Option<User>, UserServiceError> {
        Ok(self.store.find_by_id(id).await?)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, UserServiceError> {
        Ok(self.store.find_by_email(email).await?)
    }

    pub async fn get_all_users(&self) -> Result<Vec<User>, UserServiceError> {
        Ok(self.store.find_all().await?)
    }

    /// List one page of users; see [`effective_paging`] for how bounds are applied
    pub async fn get_users_with_pagination(
        &self,
        page: i64,
        limit: i64,
    ) -> Result<UserPage, UserServiceError> {
        let (page, limit) = effective_paging(page, limit);
        let result = self.store.find_with_pagination(page, limit).await?;

        Ok(UserPage {
            users: result.users,
            page,
            limit,
            total: result.total,
            total_pages: result.total_pages,
        })
    }

    /// Update name and/or email; the new email must not belong to another user
    pub async fn update_user(
        &self,
        id: &UserId,
        changes: UserChanges,
    ) -> Result<Option<User>, UserServiceError> {
        if let Some(email) = &changes.email
            && let Some(existing) = self.store.find_by_email(email).await?
            && &existing.id != id
        {
            return Err(UserServiceError::EmailAlreadyExists);
        }

        Ok(self.store.update(id, &changes).await?)
    }

    pub async fn delete_user(&self, id: &UserId) -> Result<Option<User>, UserServiceError> {
        Ok(self.store.delete(id).await?)
    }

    /// Return the user if the credentials are valid, None otherwise
    pub async fn validate_user_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, UserServiceError> {
        let user = match self.store.find_by_email(email).await? {
            Some(u) => u,
            None => return Ok(None),
        };

        let is_valid = Self::verify_password(password, &user.password_hash).await?;

        if is_valid { Ok(Some(user)) } else { Ok(None) }
    }

    pub async fn user_exists(&self, email: &str) -> Result<bool, UserServiceError> {
        Ok(self.store.exists_by_email(email).await?)
    }

    pub async fn user_exists_by_id(&self, id: &UserId) -> Result<bool, UserServiceError> {
        Ok(self.store.exists_by_id(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::repositories::InMemoryUserStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn service() -> UserService {
        UserService::new(Arc::new(InMemoryUserStore::new())).bcrypt_cost(4)
    }

    // ========================================================================
    // Password Hashing Tests
    // ========================================================================

    #[tokio::test]
    async fn test_hash_password_produces_valid_bcrypt_hash() {
        let hash = service().hash_password("my_secure_password123!").await.unwrap();

        assert!(hash.starts_with("$2b$") || hash.starts_with("$2a$") || hash.starts_with("$2y$"));
        assert_eq!(hash.len(), 60);
    }

    #[tokio::test]
    async fn test_hash_password_salts() {
        let service = service();
        let hash1 = service.hash_password("same_password").await.unwrap();
        let hash2 = service.hash_password("same_password").await.unwrap();

        assert_ne!(hash1, hash2);
    }

    #[tokio::test]
    async fn test_verify_password() {
        let hash = service().hash_password("пароль_密码_🔐").await.unwrap();

        assert!(UserService::verify_password("пароль_密码_🔐", &hash).await.unwrap());
        assert!(!UserService::verify_password("wrong_password", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_password_rejects_malformed_hash() {
        let result = UserService::verify_password("anything", "not-a-bcrypt-hash").await;
        assert!(matches!(result, Err(UserServiceError::HashingError(_))));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_hashing_leaves_the_runtime_free() {
        let service = service();
        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = {
            let ticks = ticks.clone();
            tokio::spawn(async move {
                loop {
                    ticks.fetch_add(1, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                }
            })
        };

        let hash = service.hash_password("secret1").await.unwrap();
        let during_hash = ticks.load(Ordering::SeqCst);
        assert!(UserService::verify_password("secret1", &hash).await.unwrap());
        let during_verify = ticks.load(Ordering::SeqCst);
        ticker.abort();

        // Other tasks kept running on the single worker while bcrypt ran
        assert!(during_hash > 0);
        assert!(during_verify > during_hash);
    }

    // ========================================================================
    // Paging
    // ========================================================================

    #[test]
    fn test_effective_paging() {
        assert_eq!(effective_paging(0, 500), (1, 10));
        assert_eq!(effective_paging(-3, 0), (1, 10));
        assert_eq!(effective_paging(2, 100), (2, 100));
        assert_eq!(effective_paging(1, 101), (1, 10));
        assert_eq!(effective_paging(5, 1), (5, 1));
    }

    #[tokio::test]
    async fn test_pagination_clamp_matches_defaults() {
        let service = service();
        for i in 0..12 {
            service
                .create_user(&format!("User {i}"), &format!("u{i}@example.com"), "secret1")
                .await
                .unwrap();
        }

        let clamped = service.get_users_with_pagination(0, 500).await.unwrap();
        let defaults = service.get_users_with_pagination(1, 10).await.unwrap();

        assert_eq!(clamped.page, 1);
        assert_eq!(clamped.limit, 10);
        assert_eq!(clamped.total, 12);
        assert_eq!(clamped.total_pages, 2);
        let ids = |page: &UserPage| page.users.iter().map(|u| u.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&clamped), ids(&defaults));
    }

    // ========================================================================
    // CRUD
    // ========================================================================

    #[tokio::test]
    async fn test_create_user_hashes_password() {
        let service = service();
        let user = service
            .create_user("Ada", "ada@example.com", "secret1")
            .await
            .unwrap();

        assert_ne!(user.password_hash, "secret1");
        assert!(
            UserService::verify_password("secret1", &user.password_hash)
                .await
                .unwrap()
        );
        assert!(service.user_exists("ada@example.com").await.unwrap());
        assert!(service.user_exists_by_id(&user.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_user_duplicate_email() {
        let service = service();
        service
            .create_user("Ada", "ada@example.com", "secret1")
            .await
            .unwrap();

        let result = service
            .create_user("Imposter", "ada@example.com", "secret2")
            .await;
        assert!(matches!(result, Err(UserServiceError::EmailAlreadyExists)));
        assert_eq!(service.get_all_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_user_rejects_taken_email() {
        let service = service();
        let ada = service
            .create_user("Ada", "ada@example.com", "secret1")
            .await
            .unwrap();
        service
            .create_user("Bob", "bob@example.com", "secret1")
            .await
            .unwrap();

        let result = service
            .update_user(
                &ada.id,
                UserChanges {
                    name: None,
                    email: Some("bob@example.com".to_string()),
                },
            )
            .await;
        assert!(matches!(result, Err(UserServiceError::EmailAlreadyExists)));

        let updated = service
            .update_user(
                &ada.id,
                UserChanges {
                    name: Some("Ada L.".to_string()),
                    email: Some("ada@example.com".to_string()),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Ada L.");
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_user() {
        let service = service();
        let missing = UserId::generate();

        assert!(
            service
                .update_user(&missing, UserChanges::default())
                .await
                .unwrap()
                .is_none()
        );
        assert!(service.delete_user(&missing).await.unwrap().is_none());
        assert!(service.find_user_by_id(&missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_validate_user_credentials() {
        let service = service();
        let user = service
            .create_user("Ada", "ada@example.com", "secret1")
            .await
            .unwrap();

        let valid = service
            .validate_user_credentials("ada@example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(valid.map(|u| u.id), Some(user.id));

        assert!(
            service
                .validate_user_credentials("ada@example.com", "wrong")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            service
                .validate_user_credentials("nobody@example.com", "secret1")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_find_user_by_email() {
        let service = service();
        service
            .create_user("Ada", "ada@example.com", "secret1")
            .await
            .unwrap();

        let found = service.find_user_by_email("ada@example.com").await.unwrap();
        assert_eq!(found.map(|u| u.name), Some("Ada".to_string()));
    }
}
