//! Catalog book views and edit forms

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
    models::{Book, BookDetail, BookInput, Capability, Page, PageQuery, Pagination},
    policy,
    services::catalog::BOOKS_PER_PAGE,
    AppState,
};

use super::{form_input, record_id, CurrentUser, RedirectResponse};

const BOOK_LIST: &str = "/catalog/books/";

/// List books, three per page
#[utoipa::path(
    get,
    path = "/catalog/books/",
    tag = "catalog",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of books", body = Page<Book>),
        (status = 404, description = "Page out of range")
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<Book>>> {
    let page = state
        .services
        .catalog
        .list_books(Pagination::new(query, BOOKS_PER_PAGE))
        .await?;
    Ok(Json(page))
}

/// Book with its author, genres and copies
#[utoipa::path(
    get,
    path = "/catalog/books/{id}",
    tag = "catalog",
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = BookDetail),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<BookDetail>> {
    let detail = state.services.catalog.get_book_detail(id).await?;
    Ok(Json(detail))
}

/// Initial values of the book creation form
#[utoipa::path(
    get,
    path = "/catalog/book/create/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Initial form values", body = BookInput),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing catalog.can_view_borrowed")
    )
)]
pub async fn create_form(current: CurrentUser) -> AppResult<Json<BookInput>> {
    policy::require_capability(current.principal(), Capability::ViewBorrowed)?;
    Ok(Json(BookInput::initial()))
}

/// Create a book
#[utoipa::path(
    post,
    path = "/catalog/book/create/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    request_body = BookInput,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input or duplicate ISBN"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing catalog.can_view_borrowed")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    current: CurrentUser,
    input: Result<Json<BookInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Book>)> {
    policy::require_capability(current.principal(), Capability::ViewBorrowed)?;
    let input = form_input(input)?;
    let book = state.services.catalog.create_book(input).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Current values of a book, for the update form
#[utoipa::path(
    get,
    path = "/catalog/book/{id}/update/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Form prefilled from the book", body = BookInput),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing catalog.can_view_borrowed"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_form(
    State(state): State<AppState>,
    current: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<BookInput>> {
    policy::require_capability(current.principal(), Capability::ViewBorrowed)?;
    let id = record_id(id, "Book")?;
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(BookInput::from(&book)))
}

/// Replace every field of a book
#[utoipa::path(
    post,
    path = "/catalog/book/{id}/update/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Book ID")),
    request_body = BookInput,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Invalid input or duplicate ISBN"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing catalog.can_view_borrowed"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    current: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
    input: Result<Json<BookInput>, JsonRejection>,
) -> AppResult<Json<Book>> {
    policy::require_capability(current.principal(), Capability::ViewBorrowed)?;
    let id = record_id(id, "Book")?;
    let input = form_input(input)?;
    let book = state.services.catalog.update_book(id, input).await?;
    Ok(Json(book))
}

/// Book to confirm before deletion
#[utoipa::path(
    get,
    path = "/catalog/book/{id}/delete/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book to delete", body = Book),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing catalog.can_view_borrowed"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_confirm(
    State(state): State<AppState>,
    current: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Book>> {
    policy::require_capability(current.principal(), Capability::ViewBorrowed)?;
    let id = record_id(id, "Book")?;
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Delete a book and its copies
#[utoipa::path(
    post,
    path = "/catalog/book/{id}/delete/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book deleted", body = RedirectResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing catalog.can_view_borrowed"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    current: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<RedirectResponse>> {
    policy::require_capability(current.principal(), Capability::ViewBorrowed)?;
    let id = record_id(id, "Book")?;
    state.services.catalog.delete_book(id).await?;
    Ok(Json(RedirectResponse::to(BOOK_LIST)))
}
