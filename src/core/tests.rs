//! End-to-end tests driving the full router against the in-memory store

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::app::build_router;
use crate::core::config::Config;
use crate::core::db::InMemoryUserStore;

fn config_with(extra: &[(&str, &str)]) -> Config {
    let mut vars: Vec<(String, String)> = vec![
        ("JWT_SECRET".into(), "integration_secret".into()),
        ("BCRYPT_COST".into(), "4".into()),
        ("SECURITY_ENABLE_RATE_LIMIT".into(), "false".into()),
    ];
    vars.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));

    Config::from_lookup(|name| {
        vars.iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    })
    .unwrap()
}

fn app_with(extra: &[(&str, &str)]) -> Router {
    build_router(&config_with(extra), Arc::new(InMemoryUserStore::new()))
}

fn app() -> Router {
    app_with(&[])
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    TestResponse {
        status,
        headers,
        body,
    }
}

/// Register a user and return `(id, token)`
async fn register(app: &Router, name: &str, email: &str) -> (String, String) {
    let response = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({"name": name, "email": email, "password": "secret1"})),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let data = &response.body["data"];
    (
        data["user"]["id"].as_str().unwrap().to_string(),
        data["token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn test_register_returns_user_and_token() {
    let app = app();
    let response = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({"name": "Ada", "email": "ada@example.com", "password": "secret1"})),
    )
    .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["message"], "User registered successfully");

    let user = &response.body["data"]["user"];
    assert_eq!(user["name"], "Ada");
    assert_eq!(user["email"], "ada@example.com");
    assert_eq!(user["id"].as_str().unwrap().len(), 24);
    let created_at = user["createdAt"].as_str().unwrap();
    assert_eq!(created_at.len(), "2024-01-02T03:04:05.678Z".len());
    assert!(created_at.ends_with('Z'));
    assert!(user.get("updatedAt").is_none());
    assert!(user.get("password").is_none());
    assert!(user.get("passwordHash").is_none());
    assert!(response.body["data"]["token"].as_str().unwrap().contains('.'));
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let app = app();
    register(&app, "Ada", "ada@example.com").await;

    let response = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({"name": "Other", "email": "ada@example.com", "password": "secret2"})),
    )
    .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
    assert!(
        response.body["message"]
            .as_str()
            .unwrap()
            .contains("already exists")
    );
}

#[tokio::test]
async fn test_register_accepts_long_email() {
    let app = app();
    let email = format!("{}@example.com", "a".repeat(300));
    let (_, token) = register(&app, "Ada", &email).await;

    let response = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": email, "password": "secret1"})),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["user"]["email"], email.as_str());
    assert!(!token.is_empty());
}

#[tokio::test]
async fn test_register_validation_shapes() {
    let app = app();

    let single = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({"name": "Ada", "email": "nope", "password": "secret1"})),
    )
    .await;
    assert_eq!(single.status, StatusCode::BAD_REQUEST);
    assert_eq!(single.body["message"], "email must be a valid email address");
    assert!(single.body.get("details").is_none());

    let double = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({"name": "A", "email": "ada@example.com", "password": "123"})),
    )
    .await;
    assert_eq!(double.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        double.body["message"],
        "Validation failed: name must be at least 2 characters, password must be at least 6 characters"
    );
    assert_eq!(double.body["details"].as_array().unwrap().len(), 2);

    let empty = send(&app, Method::POST, "/api/auth/register", None, None).await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
    assert_eq!(empty.body["details"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_login_flow() {
    let app = app();
    let (id, _) = register(&app, "Ada", "ada@example.com").await;

    let response = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": "ada@example.com", "password": "secret1"})),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Login successful");
    assert_eq!(response.body["data"]["user"]["id"], id.as_str());

    let token = response.body["data"]["token"].as_str().unwrap();
    let me = send(&app, Method::GET, &format!("/api/users/{id}"), Some(token), None).await;
    assert_eq!(me.status, StatusCode::OK);

    for body in [
        json!({"email": "ada@example.com", "password": "wrong-password"}),
        json!({"email": "nobody@example.com", "password": "secret1"}),
    ] {
        let response = send(&app, Method::POST, "/api/auth/login", None, Some(body)).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.body["message"], "Invalid email or password");
    }
}

#[tokio::test]
async fn test_users_require_authorization_header() {
    let app = app();
    let response = send(&app, Method::GET, "/api/users", None, None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.body,
        json!({"success": false, "message": "Authorization header is required"})
    );
}

#[tokio::test]
async fn test_users_reject_bad_tokens() {
    let app = app();

    let response = send(&app, Method::GET, "/api/users", Some("not.a.token"), None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.body["message"],
        "Unauthorized - Invalid or missing token"
    );

    // Token signed with another secret
    let other = app_with(&[("JWT_SECRET", "another_secret")]);
    let (_, foreign_token) = register(&other, "Eve", "eve@example.com").await;
    let response = send(&app, Method::GET, "/api/users", Some(&foreign_token), None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    // Header without the Bearer scheme
    let request = Request::builder()
        .uri("/api/users")
        .header(header::AUTHORIZATION, foreign_token)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_user_id_is_rejected() {
    let app = app();
    let (_, token) = register(&app, "Ada", "ada@example.com").await;

    let response = send(&app, Method::GET, "/api/users/123", Some(&token), None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "id is invalid");

    let response = send(
        &app,
        Method::DELETE,
        "/api/users/zzzzzzzzzzzzzzzzzzzzzzzz",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_users_all_and_paginated() {
    let app = app();
    let (_, token) = register(&app, "Ada", "ada@example.com").await;
    register(&app, "Grace", "grace@example.com").await;
    register(&app, "Linus", "linus@example.com").await;

    let all = send(&app, Method::GET, "/api/users", Some(&token), None).await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body["message"], "Users retrieved successfully");
    let users = all.body["data"].as_array().unwrap();
    assert_eq!(users.len(), 3);
    assert_eq!(users[0]["name"], "Ada");
    assert!(users[0].get("updatedAt").is_some());

    let page = send(
        &app,
        Method::GET,
        "/api/users?page=2&limit=2",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body["data"]["users"].as_array().unwrap().len(), 1);
    assert_eq!(page.body["data"]["users"][0]["name"], "Linus");
    assert_eq!(
        page.body["data"]["pagination"],
        json!({"page": 2, "limit": 2, "total": 3, "totalPages": 2})
    );

    // Only one of the two parameters: full list
    let partial = send(&app, Method::GET, "/api/users?page=2", Some(&token), None).await;
    assert_eq!(partial.body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_pagination_query_is_lenient() {
    let app = app();
    let (_, token) = register(&app, "Ada", "ada@example.com").await;
    register(&app, "Grace", "grace@example.com").await;
    register(&app, "Linus", "linus@example.com").await;

    // Empty, zero or non-numeric values fall back to the full list
    for query in [
        "page=&limit=10",
        "page=abc&limit=5",
        "page=0&limit=5",
        "page=1&limit=0",
    ] {
        let response = send(
            &app,
            Method::GET,
            &format!("/api/users?{query}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(response.status, StatusCode::OK, "{query}");
        assert_eq!(response.body["data"].as_array().unwrap().len(), 3, "{query}");
    }

    // Leading integer is used, like parseInt
    let fractional = send(
        &app,
        Method::GET,
        "/api/users?page=2.5&limit=2",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(fractional.status, StatusCode::OK);
    assert_eq!(fractional.body["data"]["pagination"]["page"], 2);
    assert_eq!(fractional.body["data"]["users"][0]["name"], "Linus");

    // Out-of-range values that still page are clamped by the service
    let clamped = send(
        &app,
        Method::GET,
        "/api/users?page=-4&limit=500",
        Some(&token),
        None,
    )
    .await;
    let default = send(
        &app,
        Method::GET,
        "/api/users?page=1&limit=10",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(clamped.status, StatusCode::OK);
    assert_eq!(clamped.body, default.body);
    assert_eq!(
        clamped.body["data"]["pagination"],
        json!({"page": 1, "limit": 10, "total": 3, "totalPages": 1})
    );
}

#[tokio::test]
async fn test_update_user() {
    let app = app();
    let (id, token) = register(&app, "Ada", "ada@example.com").await;
    register(&app, "Grace", "grace@example.com").await;

    let response = send(
        &app,
        Method::PUT,
        &format!("/api/users/{id}"),
        Some(&token),
        Some(json!({"name": "Ada Lovelace"})),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "User updated successfully");
    assert_eq!(response.body["data"]["name"], "Ada Lovelace");
    assert_eq!(response.body["data"]["email"], "ada@example.com");

    let taken = send(
        &app,
        Method::PUT,
        &format!("/api/users/{id}"),
        Some(&token),
        Some(json!({"email": "grace@example.com"})),
    )
    .await;
    assert_eq!(taken.status, StatusCode::BAD_REQUEST);
    assert_eq!(taken.body["message"], "User with this email already exists");

    let invalid = send(
        &app,
        Method::PUT,
        &format!("/api/users/{id}"),
        Some(&token),
        Some(json!({"name": "A"})),
    )
    .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let missing = send(
        &app,
        Method::PUT,
        "/api/users/000000000000000000000000",
        Some(&token),
        Some(json!({"name": "Nobody"})),
    )
    .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["message"], "User not found");
}

#[tokio::test]
async fn test_delete_user() {
    let app = app();
    let (_, token) = register(&app, "Ada", "ada@example.com").await;
    let (grace_id, _) = register(&app, "Grace", "grace@example.com").await;

    let path = format!("/api/users/{grace_id}");
    let response = send(&app, Method::DELETE, &path, Some(&token), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "User deleted successfully");
    assert_eq!(response.body["data"], json!({"id": grace_id}));

    let again = send(&app, Method::DELETE, &path, Some(&token), None).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);

    let fetch = send(&app, Method::GET, &path, Some(&token), None).await;
    assert_eq!(fetch.status, StatusCode::NOT_FOUND);
    assert_eq!(fetch.body["message"], "User not found");
}

#[tokio::test]
async fn test_health_is_public() {
    let app = app();
    let response = send(&app, Method::GET, "/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert!(
        chrono::DateTime::parse_from_rfc3339(response.body["timestamp"].as_str().unwrap())
            .is_ok()
    );
}

#[tokio::test]
async fn test_unknown_route_and_method() {
    let app = app();

    // The gate runs before routing
    let anonymous = send(&app, Method::GET, "/api/nothing", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let (_, token) = register(&app, "Ada", "ada@example.com").await;
    let missing = send(&app, Method::GET, "/api/nothing", Some(&token), None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["message"], "Route GET:/api/nothing not found");

    let wrong_method = send(&app, Method::DELETE, "/api/users", Some(&token), None).await;
    assert_eq!(wrong_method.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        wrong_method.body,
        json!({"success": false, "message": "Method not allowed"})
    );
}

#[tokio::test]
async fn test_custom_api_prefix() {
    let app = app_with(&[("API_PREFIX", "/v1")]);
    let response = send(
        &app,
        Method::POST,
        "/v1/auth/register",
        None,
        Some(json!({"name": "Ada", "email": "ada@example.com", "password": "secret1"})),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let token = response.body["data"]["token"].as_str().unwrap();
    let users = send(&app, Method::GET, "/v1/users", Some(token), None).await;
    assert_eq!(users.status, StatusCode::OK);
}

#[tokio::test]
async fn test_security_headers_present() {
    let app = app();
    let response = send(&app, Method::GET, "/health", None, None).await;

    assert_eq!(response.headers["x-content-type-options"], "nosniff");
    assert_eq!(response.headers["x-frame-options"], "SAMEORIGIN");
    assert_eq!(
        response.headers["strict-transport-security"],
        "max-age=31536000; includeSubDomains; preload"
    );
    assert!(response.headers.contains_key("content-security-policy"));
    assert!(!response.headers.contains_key("x-ratelimit-limit"));
}

#[tokio::test]
async fn test_rate_limit_rejects_excess_requests() {
    let app = app_with(&[
        ("SECURITY_ENABLE_RATE_LIMIT", "true"),
        ("SECURITY_RATE_LIMIT_MAX", "2"),
    ]);

    for remaining in ["1", "0"] {
        let response = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.headers["x-ratelimit-remaining"], remaining);
    }

    let response = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.body["success"], false);
    assert!(
        response.body["message"]
            .as_str()
            .unwrap()
            .starts_with("Rate limit exceeded, retry in")
    );
    assert!(response.headers.contains_key(header::RETRY_AFTER));
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let app = app_with(&[("SECURITY_MAX_REQUEST_SIZE", "64")]);
    let response = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "name": "Ada",
            "email": "ada@example.com",
            "password": "x".repeat(200)
        })),
    )
    .await;

    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.body["message"], "Request payload too large");
}
