//! Validating extractors
//!
//! Each extractor decodes one facet of the request (path, query string or
//! JSON body) into a `serde_json::Value` and runs it through a [`Schema`].
//! Rejections are [`ApiError`]s, so handlers never see unchecked input.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::{StatusCode, request::Parts},
};
use serde_json::{Map, Value};

use crate::core::response::ApiError;
use crate::core::validation::Schema;

/// Path parameters checked by `T`
#[derive(Debug, Clone)]
pub struct ValidatedPath<T>(pub T);

/// Query string checked by `T`
#[derive(Debug, Clone)]
pub struct ValidatedQuery<T>(pub T);

/// JSON body checked by `T`
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

fn string_map(pairs: HashMap<String, String>) -> Value {
    Value::Object(
        pairs
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect::<Map<_, _>>(),
    )
}

impl<S, T> FromRequestParts<S> for ValidatedPath<T>
where
    S: Send + Sync,
    T: Schema,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                tracing::debug!("path rejected: {}", e);
                ApiError::bad_request("Invalid request parameters")
            })?;

        let value = T::parse(&string_map(params))?;
        Ok(ValidatedPath(value))
    }
}

impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: Schema,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                tracing::debug!("query rejected: {}", e);
                ApiError::bad_request("Invalid query parameters")
            })?;

        let value = T::parse(&string_map(params))?;
        Ok(ValidatedQuery(value))
    }
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: Schema,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "Request payload too large")
            } else {
                ApiError::bad_request("Invalid request body")
            }
        })?;

        // An empty body is checked as an empty object so missing fields are reported
        let raw = if bytes.iter().all(u8::is_ascii_whitespace) {
            Value::Object(Map::new())
        } else {
            serde_json::from_slice(&bytes).map_err(|e| {
                tracing::debug!("body rejected: {}", e);
                ApiError::bad_request("Invalid request body")
            })?
        };

        let value = T::parse(&raw)?;
        Ok(ValidatedJson(value))
    }
}
