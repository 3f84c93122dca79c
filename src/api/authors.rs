//! Catalog author views and edit forms

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{Author, AuthorDetail, AuthorInput, Capability, Page, PageQuery, Pagination},
    policy,
    services::catalog::AUTHORS_PER_PAGE,
    AppState,
};

use super::{form_input, record_id, CurrentUser, RedirectResponse};

const AUTHOR_LIST: &str = "/catalog/author/";

/// List authors by last name, five per page
#[utoipa::path(
    get,
    path = "/catalog/author/",
    tag = "catalog",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of authors", body = Page<Author>),
        (status = 404, description = "Page out of range")
    )
)]
pub async fn list_authors(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<Author>>> {
    let page = state
        .services
        .catalog
        .list_authors(Pagination::new(query, AUTHORS_PER_PAGE))
        .await?;
    Ok(Json(page))
}

/// Author with their books
#[utoipa::path(
    get,
    path = "/catalog/author/{id}",
    tag = "catalog",
    params(("id" = i64, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author details", body = AuthorDetail),
        (status = 404, description = "Author not found")
    )
)]
pub async fn get_author(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<AuthorDetail>> {
    let detail = state.services.catalog.get_author_detail(id).await?;
    Ok(Json(detail))
}

/// Initial values of the author creation form
#[utoipa::path(
    get,
    path = "/catalog/author/create/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Initial form values", body = AuthorInput),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing catalog.can_view_borrowed")
    )
)]
pub async fn create_form(current: CurrentUser) -> AppResult<Json<AuthorInput>> {
    policy::require_capability(current.principal(), Capability::ViewBorrowed)?;
    Ok(Json(AuthorInput::initial()))
}

/// Create an author
#[utoipa::path(
    post,
    path = "/catalog/author/create/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    request_body = AuthorInput,
    responses(
        (status = 201, description = "Author created", body = Author),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing catalog.can_view_borrowed")
    )
)]
pub async fn create_author(
    State(state): State<AppState>,
    current: CurrentUser,
    input: Result<Json<AuthorInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Author>)> {
    policy::require_capability(current.principal(), Capability::ViewBorrowed)?;
    let input = form_input(input)?;
    let author = state.services.catalog.create_author(input).await?;
    Ok((StatusCode::CREATED, Json(author)))
}

/// Current values of an author, for the update form
#[utoipa::path(
    get,
    path = "/catalog/author/{id}/update/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Form prefilled from the author", body = AuthorInput),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing catalog.can_view_borrowed"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn update_form(
    State(state): State<AppState>,
    current: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<AuthorInput>> {
    policy::require_capability(current.principal(), Capability::ViewBorrowed)?;
    let id = record_id(id, "Author")?;
    let author = state.services.catalog.get_author(id).await?;
    Ok(Json(AuthorInput::from(&author)))
}

/// Replace every field of an author
#[utoipa::path(
    post,
    path = "/catalog/author/{id}/update/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Author ID")),
    request_body = AuthorInput,
    responses(
        (status = 200, description = "Author updated", body = Author),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing catalog.can_view_borrowed"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn update_author(
    State(state): State<AppState>,
    current: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
    input: Result<Json<AuthorInput>, JsonRejection>,
) -> AppResult<Json<Author>> {
    policy::require_capability(current.principal(), Capability::ViewBorrowed)?;
    let id = record_id(id, "Author")?;
    let input = form_input(input)?;
    let author = state.services.catalog.update_author(id, input).await?;
    Ok(Json(author))
}

/// Author to confirm before deletion
#[utoipa::path(
    get,
    path = "/catalog/author/{id}/delete/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author to delete", body = Author),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing catalog.can_view_borrowed"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn delete_confirm(
    State(state): State<AppState>,
    current: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Author>> {
    policy::require_capability(current.principal(), Capability::ViewBorrowed)?;
    let id = record_id(id, "Author")?;
    let author = state.services.catalog.get_author(id).await?;
    Ok(Json(author))
}

/// Delete an author; their books lose the author reference
#[utoipa::path(
    post,
    path = "/catalog/author/{id}/delete/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author deleted", body = RedirectResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing catalog.can_view_borrowed"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn delete_author(
    State(state): State<AppState>,
    current: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<RedirectResponse>> {
    policy::require_capability(current.principal(), Capability::ViewBorrowed)?;
    let id = record_id(id, "Author")?;
    state.services.catalog.delete_author(id).await?;
    Ok(Json(RedirectResponse::to(AUTHOR_LIST)))
}
