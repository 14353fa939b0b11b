//! JWT utilities for token generation and validation
//!
//! Bearer tokens are HS256-signed and carry the identity claim (`userId`,
//! `email`) plus `iat`/`exp`. Verification is all-or-nothing: any failure is
//! reported as [`JwtError::InvalidToken`].

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Scheme prefix expected in the `Authorization` header
pub const BEARER_PREFIX: &str = "Bearer ";

/// Default token lifetime (1 hour)
const DEFAULT_EXPIRATION_SECS: i64 = 60 * 60;

/// Longest accepted token lifetime (100 years)
pub const MAX_EXPIRATION_SECS: i64 = 100 * 31_557_600;

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Token lifetime in seconds
    pub expiration_secs: i64,
}

impl JwtConfig {
    /// Create a new JWT configuration
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expiration_secs: DEFAULT_EXPIRATION_SECS,
        }
    }

    /// Set token lifetime
    pub fn expiration(mut self, secs: i64) -> Self {
        self.expiration_secs = secs;
        self
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expiration_secs", &self.expiration_secs)
            .finish()
    }
}

/// JWT errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum JwtError {
    #[error("Authorization header is required")]
    MissingHeader,

    #[error("Authorization header must start with Bearer")]
    MalformedHeader,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token encoding failed: {0}")]
    EncodingError(String),

    #[error("Invalid duration: {0:?}")]
    InvalidDuration(String),
}

/// Minimal identity payload embedded in a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaim {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub email: String,
}

impl IdentityClaim {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
        }
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(flatten)]
    pub identity: IdentityClaim,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// JWT service for token operations
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    /// Create a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Sign a claim with the configured lifetime, starting now
    pub fn issue(&self, claim: &IdentityClaim) -> Result<String, JwtError> {
        self.issue_at(claim, Utc::now())
    }

    /// Sign a claim as if issued at `now`
    pub fn issue_at(&self, claim: &IdentityClaim, now: DateTime<Utc>) -> Result<String, JwtError> {
        let exp = Duration::try_seconds(self.config.expiration_secs)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                JwtError::EncodingError(format!(
                    "token lifetime of {}s is out of range",
                    self.config.expiration_secs
                ))
            })?;

        let claims = Claims {
            identity: claim.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))
    }

    /// Validate and decode a token
    pub fn verify(&self, token: &str) -> Result<IdentityClaim, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Strict expiration checking
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims.identity)
            .map_err(|e| {
                tracing::debug!("token rejected: {:?}", e.kind());
                JwtError::InvalidToken
            })
    }

    /// Token lifetime in seconds
    pub fn expiration_secs(&self) -> i64 {
        self.config.expiration_secs
    }
}

/// Pull the raw token out of an `Authorization` header value
pub fn extract_from_header(header: Option<&str>) -> Result<&str, JwtError> {
    let header = header.ok_or(JwtError::MissingHeader)?;
    header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(JwtError::MalformedHeader)
}

/// Parse a lifetime such as `"1h"`, `"30 minutes"` or `"3600"` into seconds.
///
/// A bare integer is read as seconds. Units are case-insensitive.
pub fn parse_duration(input: &str) -> Result<i64, JwtError> {
    let invalid = || JwtError::InvalidDuration(input.to_string());

    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);
    if digits.is_empty() {
        return Err(invalid());
    }

    let amount: i64 = digits.parse().map_err(|_| invalid())?;
    let unit = unit.trim().to_ascii_lowercase();

    let seconds = match unit.as_str() {
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => amount / 1000,
        "" | "s" | "sec" | "secs" | "second" | "seconds" => amount,
        "m" | "min" | "mins" | "minute" | "minutes" => amount.checked_mul(60).ok_or_else(invalid)?,
        "h" | "hr" | "hrs" | "hour" | "hours" => amount.checked_mul(3_600).ok_or_else(invalid)?,
        "d" | "day" | "days" => amount.checked_mul(86_400).ok_or_else(invalid)?,
        "w" | "week" | "weeks" => amount.checked_mul(604_800).ok_or_else(invalid)?,
        "y" | "yr" | "yrs" | "year" | "years" => {
            amount.checked_mul(31_557_600).ok_or_else(invalid)?
        }
        _ => return Err(invalid()),
    };

    if !(1..=MAX_EXPIRATION_SECS).contains(&seconds) {
        return Err(invalid());
    }

    Ok(seconds)
}
