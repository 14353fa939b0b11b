//! Users API endpoints
//!
//! All routes require a bearer token (enforced by the auth gate):
//! - GET {prefix}/users - List users, optionally paginated
//! - GET {prefix}/users/{id} - Fetch one user
//! - PUT {prefix}/users/{id} - Update name and/or email
//! - DELETE {prefix}/users/{id} - Delete a user

use axum::{Extension, Router, extract::State, routing::get};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::core::auth::IdentityClaim;
use crate::core::db::models::{UserChanges, UserId, UserResponse};
use crate::core::extract::{ValidatedJson, ValidatedPath, ValidatedQuery};
use crate::core::response::{ApiError, ApiSuccess};
use crate::core::users::service::{UserService, UserServiceError};
use crate::core::validation::{Length, ObjectValidator, Schema, ValidationFailure, is_object_id};

/// Users API state containing the user service
#[derive(Clone)]
pub struct UsersApiState {
    pub user_service: UserService,
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::EmailAlreadyExists => ApiError::bad_request(err.to_string()),
            other => {
                tracing::error!("User request failed: {}", other);
                ApiError::internal()
            }
        }
    }
}

// ============================================================================
// Request facets
// ============================================================================

/// `{id}` path parameter
#[derive(Debug, Clone)]
pub struct UserIdParam {
    pub id: UserId,
}

impl Schema for UserIdParam {
    fn parse(value: &Value) -> Result<Self, ValidationFailure> {
        let mut fields = ObjectValidator::new(value, "params")?;
        let id = fields
            .matching("id", is_object_id)
            .and_then(|id| UserId::parse(&id));
        fields.finish(id.map(|id| Self { id }))
    }
}

/// Optional paging parameters for the list endpoint.
///
/// Lenient: empty, zero and non-numeric values count as not provided, and
/// `"2.5"` reads as 2. Range clamping happens in the service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListUsersQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl Schema for ListUsersQuery {
    fn parse(value: &Value) -> Result<Self, ValidationFailure> {
        let fields = ObjectValidator::new(value, "query")?;
        let page = fields.leading_integer("page").filter(|page| *page != 0);
        let limit = fields.leading_integer("limit").filter(|limit| *limit != 0);
        fields.finish(Some(Self { page, limit }))
    }
}

/// Body of `PUT /users/{id}`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Schema for UpdateUserRequest {
    fn parse(value: &Value) -> Result<Self, ValidationFailure> {
        let mut fields = ObjectValidator::new(value, "body")?;
        let name = fields.optional_string("name", Length::between(2, 50));
        let email = fields.optional_email("email");
        fields.finish(Some(Self { name, email }))
    }
}

impl From<UpdateUserRequest> for UserChanges {
    fn from(request: UpdateUserRequest) -> Self {
        Self {
            name: request.name,
            email: request.email,
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// Either one page with its metadata, or every user
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum UserListing {
    Paged {
        users: Vec<UserResponse>,
        pagination: Pagination,
    },
    All(Vec<UserResponse>),
}

#[derive(Debug, Serialize)]
pub struct DeletedUser {
    pub id: UserId,
}

// ============================================================================
// Handlers
// ============================================================================

/// Create the users API router
pub fn users_api_router(state: UsersApiState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/users", get(list_users_handler))
        .route(
            "/users/{id}",
            get(get_user_handler)
                .put(update_user_handler)
                .delete(delete_user_handler),
        )
        .with_state(state)
}

/// GET /users
/// Paginated when both `page` and `limit` are given, otherwise the full list
async fn list_users_handler(
    State(state): State<Arc<UsersApiState>>,
    ValidatedQuery(query): ValidatedQuery<ListUsersQuery>,
) -> Result<ApiSuccess<UserListing>, ApiError> {
    let listing = match (query.page, query.limit) {
        (Some(page), Some(limit)) => {
            let page = state
                .user_service
                .get_users_with_pagination(page, limit)
                .await?;

            UserListing::Paged {
                users: page.users.into_iter().map(UserResponse::from).collect(),
                pagination: Pagination {
                    page: page.page,
                    limit: page.limit,
                    total: page.total,
                    total_pages: page.total_pages,
                },
            }
        }
        _ => {
            let users = state.user_service.get_all_users().await?;
            UserListing::All(users.into_iter().map(UserResponse::from).collect())
        }
    };

    Ok(ApiSuccess::ok(listing, "Users retrieved successfully"))
}

/// GET /users/{id}
async fn get_user_handler(
    State(state): State<Arc<UsersApiState>>,
    ValidatedPath(params): ValidatedPath<UserIdParam>,
) -> Result<ApiSuccess<UserResponse>, ApiError> {
    let user = state
        .user_service
        .find_user_by_id(&params.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(ApiSuccess::ok(user.into(), "User retrieved successfully"))
}

/// PUT /users/{id}
async fn update_user_handler(
    State(state): State<Arc<UsersApiState>>,
    Extension(identity): Extension<IdentityClaim>,
    ValidatedPath(params): ValidatedPath<UserIdParam>,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> Result<ApiSuccess<UserResponse>, ApiError> {
    let user = state
        .user_service
        .update_user(&params.id, request.into())
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    tracing::info!("User {} updated by {}", user.id, identity.user_id);

    Ok(ApiSuccess::ok(user.into(), "User updated successfully"))
}

/// DELETE /users/{id}
async fn delete_user_handler(
    State(state): State<Arc<UsersApiState>>,
    Extension(identity): Extension<IdentityClaim>,
    ValidatedPath(params): ValidatedPath<UserIdParam>,
) -> Result<ApiSuccess<DeletedUser>, ApiError> {
    let user = state
        .user_service
        .delete_user(&params.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    tracing::info!("User {} deleted by {}", user.id, identity.user_id);

    Ok(ApiSuccess::ok(
        DeletedUser { id: user.id },
        "User deleted successfully",
    ))
}
