//! REST collections for users and groups

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{Group, GroupInput, Page, PageQuery, Pagination, User, UserInput},
    services::users::API_PER_PAGE,
    AppState,
};

use super::{rest::resource_url, AuthenticatedUser};

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResource {
    pub url: String,
    pub username: String,
    pub email: String,
    pub groups: Vec<String>,
}

impl From<User> for UserResource {
    fn from(user: User) -> Self {
        Self {
            url: resource_url("users", user.id),
            username: user.username,
            email: user.email,
            groups: user
                .group_ids
                .into_iter()
                .map(|id| resource_url("groups", id))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GroupResource {
    pub url: String,
    pub name: String,
}

impl From<Group> for GroupResource {
    fn from(group: Group) -> Self {
        Self {
            url: resource_url("groups", group.id),
            name: group.name,
        }
    }
}

/// List users, most recently joined first
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Page of users", body = Page<UserResource>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<UserResource>>> {
    let page = state
        .services
        .users
        .list_users(Pagination::new(query, API_PER_PAGE))
        .await?;
    Ok(Json(page.map(UserResource::from)))
}

/// Get user by ID
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserResource),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<UserResource>> {
    let user = state.services.users.get_user(id).await?;
    Ok(Json(user.into()))
}

/// Create a user
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = UserInput,
    responses(
        (status = 201, description = "User created", body = UserResource),
        (status = 400, description = "Invalid input or username taken")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Json(input): Json<UserInput>,
) -> AppResult<(StatusCode, Json<UserResource>)> {
    let user = state.services.users.create_user(input).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Update a user
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User ID")),
    request_body = UserInput,
    responses(
        (status = 200, description = "User updated", body = UserResource),
        (status = 400, description = "Invalid input or username taken"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(input): Json<UserInput>,
) -> AppResult<Json<UserResource>> {
    let user = state.services.users.update_user(id, input).await?;
    Ok(Json(user.into()))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.services.users.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List groups
#[utoipa::path(
    get,
    path = "/api/v1/groups",
    tag = "users",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Page of groups", body = Page<GroupResource>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_groups(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<GroupResource>>> {
    let page = state
        .services
        .users
        .list_groups(Pagination::new(query, API_PER_PAGE))
        .await?;
    Ok(Json(page.map(GroupResource::from)))
}

/// Get group by ID
#[utoipa::path(
    get,
    path = "/api/v1/groups/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Group", body = GroupResource),
        (status = 404, description = "Group not found")
    )
)]
pub async fn get_group(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<GroupResource>> {
    let group = state.services.users.get_group(id).await?;
    Ok(Json(group.into()))
}

/// Create a group
#[utoipa::path(
    post,
    path = "/api/v1/groups",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = GroupInput,
    responses(
        (status = 201, description = "Group created", body = GroupResource),
        (status = 400, description = "Invalid input or duplicate name")
    )
)]
pub async fn create_group(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Json(input): Json<GroupInput>,
) -> AppResult<(StatusCode, Json<GroupResource>)> {
    let group = state.services.users.create_group(input).await?;
    Ok((StatusCode::CREATED, Json(group.into())))
}

/// Update a group
#[utoipa::path(
    put,
    path = "/api/v1/groups/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Group ID")),
    request_body = GroupInput,
    responses(
        (status = 200, description = "Group updated", body = GroupResource),
        (status = 404, description = "Group not found")
    )
)]
pub async fn update_group(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(input): Json<GroupInput>,
) -> AppResult<Json<GroupResource>> {
    let group = state.services.users.update_group(id, input).await?;
    Ok(Json(group.into()))
}

/// Delete a group
#[utoipa::path(
    delete,
    path = "/api/v1/groups/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Group ID")),
    responses(
        (status = 204, description = "Group deleted"),
        (status = 404, description = "Group not found")
    )
)]
pub async fn delete_group(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.services.users.delete_group(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
