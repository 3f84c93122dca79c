//! REST collections for books, genres and authors
//!
//! Records are projected to fixed field sets whose references are
//! hyperlinks to other resources of the API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{Author, AuthorInput, Book, BookInput, Genre, GenreInput, Page, PageQuery, Pagination},
    services::users::API_PER_PAGE,
    AppState,
};

use super::AuthenticatedUser;

/// Hyperlink to a record of the REST API
pub(crate) fn resource_url(collection: &str, id: i64) -> String {
    format!("/api/v1/{}/{}", collection, id)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookResource {
    pub url: String,
    pub title: String,
    pub author: Option<String>,
    pub summary: String,
    pub isbn: String,
    pub genre: Vec<String>,
}

impl From<Book> for BookResource {
    fn from(book: Book) -> Self {
        Self {
            url: resource_url("books", book.id),
            title: book.title,
            author: book.author_id.map(|id| resource_url("authors", id)),
            summary: book.summary,
            isbn: book.isbn,
            genre: book
                .genre_ids
                .into_iter()
                .map(|id| resource_url("genres", id))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GenreResource {
    pub url: String,
    pub name: String,
}

impl From<Genre> for GenreResource {
    fn from(genre: Genre) -> Self {
        Self {
            url: resource_url("genres", genre.id),
            name: genre.name,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthorResource {
    pub url: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_death: Option<NaiveDate>,
}

impl From<Author> for AuthorResource {
    fn from(author: Author) -> Self {
        Self {
            url: resource_url("authors", author.id),
            first_name: author.first_name,
            last_name: author.last_name,
            date_of_birth: author.date_of_birth,
            date_of_death: author.date_of_death,
        }
    }
}

// =============================================================================
// BOOKS
// =============================================================================

/// List books
#[utoipa::path(
    get,
    path = "/api/v1/books",
    tag = "books",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Page of books", body = Page<BookResource>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<BookResource>>> {
    let page = state
        .services
        .catalog
        .list_books(Pagination::new(query, API_PER_PAGE))
        .await?;
    Ok(Json(page.map(BookResource::from)))
}

/// Get book by ID
#[utoipa::path(
    get,
    path = "/api/v1/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book", body = BookResource),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<BookResource>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book.into()))
}

/// Create a book
#[utoipa::path(
    post,
    path = "/api/v1/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = BookInput,
    responses(
        (status = 201, description = "Book created", body = BookResource),
        (status = 400, description = "Invalid input or duplicate ISBN")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Json(input): Json<BookInput>,
) -> AppResult<(StatusCode, Json<BookResource>)> {
    let book = state.services.catalog.create_book(input).await?;
    Ok((StatusCode::CREATED, Json(book.into())))
}

/// Update a book
#[utoipa::path(
    put,
    path = "/api/v1/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Book ID")),
    request_body = BookInput,
    responses(
        (status = 200, description = "Book updated", body = BookResource),
        (status = 400, description = "Invalid input or duplicate ISBN"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(input): Json<BookInput>,
) -> AppResult<Json<BookResource>> {
    let book = state.services.catalog.update_book(id, input).await?;
    Ok(Json(book.into()))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/api/v1/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// GENRES
// =============================================================================

/// List genres
#[utoipa::path(
    get,
    path = "/api/v1/genres",
    tag = "genres",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Page of genres", body = Page<GenreResource>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_genres(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<GenreResource>>> {
    let page = state
        .services
        .catalog
        .list_genres(Pagination::new(query, API_PER_PAGE))
        .await?;
    Ok(Json(page.map(GenreResource::from)))
}

/// Get genre by ID
#[utoipa::path(
    get,
    path = "/api/v1/genres/{id}",
    tag = "genres",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Genre ID")),
    responses(
        (status = 200, description = "Genre", body = GenreResource),
        (status = 404, description = "Genre not found")
    )
)]
pub async fn get_genre(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<GenreResource>> {
    let genre = state.services.catalog.get_genre(id).await?;
    Ok(Json(genre.into()))
}

/// Create a genre
#[utoipa::path(
    post,
    path = "/api/v1/genres",
    tag = "genres",
    security(("bearer_auth" = [])),
    request_body = GenreInput,
    responses(
        (status = 201, description = "Genre created", body = GenreResource),
        (status = 400, description = "Invalid input or duplicate name")
    )
)]
pub async fn create_genre(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Json(input): Json<GenreInput>,
) -> AppResult<(StatusCode, Json<GenreResource>)> {
    let genre = state.services.catalog.create_genre(input).await?;
    Ok((StatusCode::CREATED, Json(genre.into())))
}

/// Update a genre
#[utoipa::path(
    put,
    path = "/api/v1/genres/{id}",
    tag = "genres",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Genre ID")),
    request_body = GenreInput,
    responses(
        (status = 200, description = "Genre updated", body = GenreResource),
        (status = 404, description = "Genre not found")
    )
)]
pub async fn update_genre(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(input): Json<GenreInput>,
) -> AppResult<Json<GenreResource>> {
    let genre = state.services.catalog.update_genre(id, input).await?;
    Ok(Json(genre.into()))
}

/// Delete a genre
#[utoipa::path(
    delete,
    path = "/api/v1/genres/{id}",
    tag = "genres",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Genre ID")),
    responses(
        (status = 204, description = "Genre deleted"),
        (status = 404, description = "Genre not found")
    )
)]
pub async fn delete_genre(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_genre(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// AUTHORS
// =============================================================================

/// List authors
#[utoipa::path(
    get,
    path = "/api/v1/authors",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Page of authors", body = Page<AuthorResource>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_authors(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<AuthorResource>>> {
    let page = state
        .services
        .catalog
        .list_authors(Pagination::new(query, API_PER_PAGE))
        .await?;
    Ok(Json(page.map(AuthorResource::from)))
}

/// Get author by ID
#[utoipa::path(
    get,
    path = "/api/v1/authors/{id}",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author", body = AuthorResource),
        (status = 404, description = "Author not found")
    )
)]
pub async fn get_author(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<AuthorResource>> {
    let author = state.services.catalog.get_author(id).await?;
    Ok(Json(author.into()))
}

/// Create an author
#[utoipa::path(
    post,
    path = "/api/v1/authors",
    tag = "authors",
    security(("bearer_auth" = [])),
    request_body = AuthorInput,
    responses(
        (status = 201, description = "Author created", body = AuthorResource),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_author(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Json(input): Json<AuthorInput>,
) -> AppResult<(StatusCode, Json<AuthorResource>)> {
    let author = state.services.catalog.create_author(input).await?;
    Ok((StatusCode::CREATED, Json(author.into())))
}

/// Update an author
#[utoipa::path(
    put,
    path = "/api/v1/authors/{id}",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Author ID")),
    request_body = AuthorInput,
    responses(
        (status = 200, description = "Author updated", body = AuthorResource),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn update_author(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(input): Json<AuthorInput>,
) -> AppResult<Json<AuthorResource>> {
    let author = state.services.catalog.update_author(id, input).await?;
    Ok(Json(author.into()))
}

/// Delete an author
#[utoipa::path(
    delete,
    path = "/api/v1/authors/{id}",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Author ID")),
    responses(
        (status = 204, description = "Author deleted"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn delete_author(
    State(state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_author(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
