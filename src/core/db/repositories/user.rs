//! User store for database operations
//!
//! [`UserStore`] is the single access point for user records. [`PgUserStore`]
//! backs it with PostgreSQL; see [`super::memory`] for the in-process variant.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use crate::core::db::models::{NewUser, User, UserChanges, UserId};

/// User store error types
#[derive(Debug, thiserror::Error)]
pub enum UserRepositoryError {
    #[error("User with this email already exists")]
    EmailAlreadyExists,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Translate a unique-index violation into [`UserRepositoryError::EmailAlreadyExists`]
fn map_unique_violation(err: sqlx::Error) -> UserRepositoryError {
    match err.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => UserRepositoryError::EmailAlreadyExists,
        _ => UserRepositoryError::DatabaseError(err),
    }
}

/// One page of users plus totals
#[derive(Debug, Clone)]
pub struct Page {
    pub users: Vec<User>,
    pub total: i64,
    pub total_pages: i64,
}

/// Number of pages needed for `total` items, `limit` per page
pub fn total_pages(total: i64, limit: i64) -> i64 {
    if total <= 0 || limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

/// Storage operations for user records
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError>;

    /// All users, oldest first
    async fn find_all(&self) -> Result<Vec<User>, UserRepositoryError>;

    async fn create(&self, user: NewUser) -> Result<User, UserRepositoryError>;

    /// Apply `changes`; `None` if no user has this id
    async fn update(
        &self,
        id: &UserId,
        changes: &UserChanges,
    ) -> Result<Option<User>, UserRepositoryError>;

    /// Remove and return the user; `None` if no user has this id
    async fn delete(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError>;

    async fn exists_by_email(&self, email: &str) -> Result<bool, UserRepositoryError>;

    async fn exists_by_id(&self, id: &UserId) -> Result<bool, UserRepositoryError>;

    /// Users in `find_all` order, skipping `offset` and taking at most `limit`
    async fn find_page(&self, offset: i64, limit: i64) -> Result<Vec<User>, UserRepositoryError>;

    async fn count(&self) -> Result<i64, UserRepositoryError>;

    /// Page `page` (1-based) of `limit` users
    async fn find_with_pagination(
        &self,
        page: i64,
        limit: i64,
    ) -> Result<Page, UserRepositoryError> {
        let offset = (page.max(1) - 1).saturating_mul(limit.max(0));
        let users = self.find_page(offset, limit).await?;
        let total = self.count().await?;

        Ok(Page {
            users,
            total,
            total_pages: total_pages(total, limit),
        })
    }
}

/// PostgreSQL user store
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new user store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_all(&self) -> Result<Vec<User>, UserRepositoryError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM users
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn create(&self, user: NewUser) -> Result<User, UserRepositoryError> {
        let now = Utc::now();

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id, name, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(UserId::generate_at(now))
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(user)
    }

    async fn update(
        &self,
        id: &UserId,
        changes: &UserChanges,
    ) -> Result<Option<User>, UserRepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(user)
    }

    async fn delete(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            DELETE FROM users
            WHERE id = $1
            RETURNING id, name, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, UserRepositoryError> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists.0)
    }

    async fn exists_by_id(&self, id: &UserId) -> Result<bool, UserRepositoryError> {
        let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists.0)
    }

    async fn find_page(&self, offset: i64, limit: i64) -> Result<Vec<User>, UserRepositoryError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM users
            ORDER BY created_at ASC, id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn count(&self) -> Result<i64, UserRepositoryError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
