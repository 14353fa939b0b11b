//! Database models for usergate
//!
//! This module defines the entity structs that map to PostgreSQL tables.

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize, Serializer};
use sqlx::FromRow;

use crate::core::validation::is_object_id;

// ============================================================================
// User Id
// ============================================================================

/// 24-character lowercase hex identifier.
///
/// The first 4 bytes are the creation time in seconds (big-endian), the
/// remaining 8 are random.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    sqlx::Type,
    derive_more::Display,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct UserId(String);

impl UserId {
    /// Generate a fresh id stamped with the current time
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    pub fn generate_at(now: DateTime<Utc>) -> Self {
        let mut bytes = [0u8; 12];
        let seconds = now.timestamp().clamp(0, u32::MAX as i64) as u32;
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        rand::thread_rng().fill(&mut bytes[4..]);
        Self(hex::encode(bytes))
    }

    /// Parse a 24-digit hex string; case is normalised to lowercase
    pub fn parse(value: &str) -> Option<Self> {
        is_object_id(value).then(|| Self(value.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creation time encoded in the id
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let bytes = hex::decode(self.0.get(..8)?).ok()?;
        let seconds = u32::from_be_bytes(bytes.try_into().ok()?);
        DateTime::from_timestamp(seconds as i64, 0)
    }
}

// ============================================================================
// User Model
// ============================================================================

/// User entity representing a registered user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User data for creation (password already hashed)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Partial update; `None` leaves the column untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

/// User without sensitive data (for API responses)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(serialize_with = "serialize_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_millis"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

/// RFC 3339 in UTC with millisecond precision, e.g. `2024-01-02T03:04:05.678Z`
fn serialize_millis<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn serialize_optional_millis<S: Serializer>(
    at: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match at {
        Some(at) => serialize_millis(at, serializer),
        None => serializer.serialize_none(),
    }
}

impl UserResponse {
    /// Shape used by register/login, which do not expose `updatedAt`
    pub fn summary(user: User) -> Self {
        Self {
            updated_at: None,
            ..user.into()
        }
    }
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
            updated_at: Some(user.updated_at),
        }
    }
}
