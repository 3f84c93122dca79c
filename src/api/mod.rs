//! HTTP handlers and router for the LocalLibrary server

pub mod auth;
pub mod authors;
pub mod books;
pub mod health;
pub mod home;
pub mod loans;
pub mod openapi;
pub mod rest;
pub mod users;

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequestParts, Path,
    },
    http::{header::AUTHORIZATION, request::Parts},
    response::Redirect,
    routing::get,
    Json, Router,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::UserClaims,
    policy,
    AppState,
};

/// Principal of the request, if any.
///
/// A request without an `Authorization` header is anonymous; a header that is
/// not a valid bearer token is rejected.
pub struct CurrentUser(pub Option<UserClaims>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(CurrentUser(None));
        }

        let bearer = parts
            .headers
            .typed_get::<Authorization<Bearer>>()
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(bearer.token(), &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(CurrentUser(Some(claims)))
    }
}

impl CurrentUser {
    pub fn principal(&self) -> Option<&UserClaims> {
        self.0.as_ref()
    }
}

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await?;
        let claims = policy::require_authenticated(current.principal())?;
        Ok(AuthenticatedUser(claims.clone()))
    }
}

/// Where the client should go after a completed form action
#[derive(Debug, Serialize, ToSchema)]
pub struct RedirectResponse {
    pub redirect_to: String,
}

impl RedirectResponse {
    pub fn to(target: &str) -> Self {
        Self {
            redirect_to: target.to_string(),
        }
    }
}

// Gated handlers take their path and body as `Result`s so the policy check
// runs before any parsing failure can be reported.

/// Record id from the path; an id that does not parse names no record
pub(crate) fn record_id<T>(id: Result<Path<T>, PathRejection>, record: &str) -> AppResult<T> {
    id.map(|Path(id)| id)
        .map_err(|_| AppError::NotFound(format!("{} not found", record)))
}

/// Submitted form body
pub(crate) fn form_input<T>(body: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    body.map(|Json(input)| input)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Catalog views
    let catalog = Router::new()
        .route("/catalog/", get(home::index))
        .route("/catalog/books/", get(books::list_books))
        .route("/catalog/books/:id", get(books::get_book))
        .route("/catalog/book/create/", get(books::create_form).post(books::create_book))
        .route("/catalog/book/:id/update/", get(books::update_form).post(books::update_book))
        .route("/catalog/book/:id/delete/", get(books::delete_confirm).post(books::delete_book))
        .route("/catalog/book/:id/renew/", get(loans::renewal_form).post(loans::renew_copy))
        .route("/catalog/author/", get(authors::list_authors))
        .route("/catalog/author/:id", get(authors::get_author))
        .route("/catalog/author/create/", get(authors::create_form).post(authors::create_author))
        .route("/catalog/author/:id/update/", get(authors::update_form).post(authors::update_author))
        .route("/catalog/author/:id/delete/", get(authors::delete_confirm).post(authors::delete_author))
        .route("/catalog/mybooks/", get(loans::my_borrowed))
        .route("/catalog/borrowed", get(loans::all_borrowed));

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/login", axum::routing::post(auth::login))
        .route("/auth/me", get(auth::me))
        // Users and groups
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/:id", get(users::get_user).put(users::update_user).delete(users::delete_user))
        .route("/groups", get(users::list_groups).post(users::create_group))
        .route("/groups/:id", get(users::get_group).put(users::update_group).delete(users::delete_group))
        // Catalog records
        .route("/books", get(rest::list_books).post(rest::create_book))
        .route("/books/:id", get(rest::get_book).put(rest::update_book).delete(rest::delete_book))
        .route("/genres", get(rest::list_genres).post(rest::create_genre))
        .route("/genres/:id", get(rest::get_genre).put(rest::update_genre).delete(rest::delete_genre))
        .route("/authors", get(rest::list_authors).post(rest::create_author))
        .route(
            "/authors/:id",
            get(rest::get_author).put(rest::update_author).delete(rest::delete_author),
        );

    // OpenAPI documentation
    let openapi = openapi::create_openapi_router();

    Router::new()
        .route("/", get(|| async { Redirect::permanent("/catalog/") }))
        .route("/api/1", get(home::hello))
        .merge(catalog)
        .nest("/api/v1", api_v1)
        .with_state(state)
        .merge(openapi)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use chrono::{NaiveDate, Utc};
    use mockall::predicate::eq;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::{
        config::AppConfig,
        models::{Author, Book, BookInstance, BorrowedCopy, Capability, LoanStatus},
        repository::{
            MockAuthorsRepository, MockBookInstancesRepository, MockBooksRepository,
            MockGenresRepository, MockGroupsRepository, MockUsersRepository, Repository,
        },
        services::{sessions::MemorySessionStore, Clock, Services},
    };

    struct FixedClock;

    impl Clock for FixedClock {
        fn today(&self) -> NaiveDate {
            NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()
        }
    }

    #[derive(Default)]
    struct Mocks {
        genres: MockGenresRepository,
        authors: MockAuthorsRepository,
        books: MockBooksRepository,
        book_instances: MockBookInstancesRepository,
    }

    fn app(mocks: Mocks) -> Router {
        let config = AppConfig::default();
        let repository = Repository::from_parts(
            Arc::new(mocks.genres),
            Arc::new(mocks.authors),
            Arc::new(mocks.books),
            Arc::new(mocks.book_instances),
            Arc::new(MockUsersRepository::new()),
            Arc::new(MockGroupsRepository::new()),
        );
        let services = Services::new(
            repository,
            config.auth.clone(),
            Arc::new(MemorySessionStore::new(Duration::from_secs(3600))),
            Arc::new(FixedClock),
        );
        create_router(AppState {
            config: Arc::new(config),
            services: Arc::new(services),
            site_token: Some(Arc::from("site-token")),
        })
    }

    fn bearer(capabilities: Vec<Capability>) -> String {
        let now = Utc::now().timestamp();
        let claims = UserClaims {
            sub: "someone".to_string(),
            user_id: 2,
            capabilities,
            exp: now + 600,
            iat: now,
        };
        let token = claims
            .create_token(&AppConfig::default().auth.jwt_secret)
            .unwrap();
        format!("Bearer {}", token)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn get_as(uri: &str, authorization: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, authorization)
            .body(Body::empty())
            .unwrap()
    }

    fn post(uri: &str, authorization: Option<&str>, body: Option<&str>) -> Request<Body> {
        let mut request = Request::builder().method("POST").uri(uri);
        if let Some(authorization) = authorization {
            request = request.header(header::AUTHORIZATION, authorization);
        }
        match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        }
    }

    async fn assert_error(response: Response, status: StatusCode, code: u32) {
        assert_eq!(response.status(), status);
        assert_eq!(json_body(response).await["code"], code);
    }

    fn on_loan(id: Uuid) -> BookInstance {
        BookInstance {
            id,
            book_id: 1,
            imprint: String::new(),
            due_back: NaiveDate::from_ymd_opt(2024, 5, 20),
            borrower_id: Some(7),
            status: LoanStatus::OnLoan,
            created_at: Utc::now(),
        }
    }

    fn dune() -> Book {
        Book {
            id: 5,
            title: "Dune".to_string(),
            author_id: None,
            summary: "Arrakis".to_string(),
            isbn: "9780441172719".to_string(),
            genre_ids: Vec::new(),
        }
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn home_mocks() -> Mocks {
        let mut mocks = Mocks::default();
        mocks.books.expect_count().returning(|| Ok(3));
        mocks.books.expect_count_by_genre_name().returning(|_| Ok(1));
        mocks.book_instances.expect_count().returning(|| Ok(5));
        mocks.book_instances.expect_count_by_status().returning(|_| Ok(2));
        mocks.authors.expect_count().returning(|| Ok(2));
        mocks
    }

    #[tokio::test]
    async fn test_hello() {
        let response = app(Mocks::default()).oneshot(get("/api/1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "message": "Hello World!" }));
    }

    #[tokio::test]
    async fn test_root_redirects_to_catalog() {
        let response = app(Mocks::default()).oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/catalog/");
    }

    #[tokio::test]
    async fn test_home_counts_visits_per_session() {
        let app = app(home_mocks());

        let first = app.clone().oneshot(get("/catalog/")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let cookie = first.headers()[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();
        let body = json_body(first).await;
        assert_eq!(body["num_visits"], 1);
        assert_eq!(body["num_books"], 3);
        assert_eq!(body["genre"], "science");
        assert_eq!(body["site_token"], "site-token");

        let second = Request::builder()
            .uri("/catalog/")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let body = json_body(app.clone().oneshot(second).await.unwrap()).await;
        assert_eq!(body["num_visits"], 2);

        let fresh = json_body(app.oneshot(get("/catalog/")).await.unwrap()).await;
        assert_eq!(fresh["num_visits"], 1);
    }

    #[tokio::test]
    async fn test_home_genre_override() {
        let mut mocks = home_mocks();
        mocks.books = MockBooksRepository::new();
        mocks.books.expect_count().returning(|| Ok(3));
        mocks
            .books
            .expect_count_by_genre_name()
            .withf(|fragment| fragment == "fiction")
            .returning(|_| Ok(2));

        let body = json_body(app(mocks).oneshot(get("/catalog/?genre=fiction")).await.unwrap()).await;
        assert_eq!(body["genre"], "fiction");
        assert_eq!(body["num_genre_books"], 2);
    }

    #[tokio::test]
    async fn test_borrowed_view_policy() {
        let anonymous = app(Mocks::default())
            .oneshot(get("/catalog/borrowed"))
            .await
            .unwrap();
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let forbidden = app(Mocks::default())
            .oneshot(get_as("/catalog/borrowed", &bearer(vec![])))
            .await
            .unwrap();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(forbidden).await["code"], 3);

        let mut mocks = Mocks::default();
        mocks.book_instances.expect_count_on_loan().returning(|_| Ok(1));
        mocks.book_instances.expect_list_on_loan().returning(|_, _, _, _| {
            Ok(vec![BorrowedCopy {
                id: Uuid::new_v4(),
                book_id: 1,
                book_title: "Kindred".to_string(),
                imprint: String::new(),
                due_back: NaiveDate::from_ymd_opt(2024, 5, 20),
                borrower_id: Some(7),
                borrower_username: Some("patron".to_string()),
                is_overdue: false,
            }])
        });
        let allowed = app(mocks)
            .oneshot(get_as("/catalog/borrowed", &bearer(vec![Capability::ViewBorrowed])))
            .await
            .unwrap();
        assert_eq!(allowed.status(), StatusCode::OK);
        let body = json_body(allowed).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["items"][0]["book_title"], "Kindred");
    }

    #[tokio::test]
    async fn test_invalid_token_rejected() {
        let response = app(Mocks::default())
            .oneshot(get_as("/catalog/mybooks/", "Bearer not-a-token"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_renew_with_past_date_is_invalid_date() {
        let id = Uuid::new_v4();
        let mut mocks = Mocks::default();
        mocks
            .book_instances
            .expect_get_by_id()
            .with(eq(id))
            .returning(|id| {
                Ok(BookInstance {
                    id,
                    book_id: 1,
                    imprint: String::new(),
                    due_back: NaiveDate::from_ymd_opt(2024, 5, 20),
                    borrower_id: Some(7),
                    status: LoanStatus::OnLoan,
                    created_at: Utc::now(),
                })
            });
        mocks.book_instances.expect_update_due_back().never();

        let request = Request::builder()
            .method("POST")
            .uri(format!("/catalog/book/{}/renew/", id))
            .header(header::AUTHORIZATION, bearer(vec![Capability::MarkReturned]))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "renewal_date": "2024-05-14" }).to_string()))
            .unwrap();
        let response = app(mocks).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["code"], 6);
        assert_eq!(body["message"], "Invalid date - renewal in past");
    }

    #[tokio::test]
    async fn test_author_detail_unknown_id_not_found() {
        let mut mocks = Mocks::default();
        mocks
            .authors
            .expect_get_by_id()
            .with(eq(42))
            .returning(|id| Err(AppError::NotFound(format!("Author with id {} not found", id))));

        let response = app(mocks).oneshot(get("/catalog/author/42")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rest_api_requires_login() {
        let response = app(Mocks::default()).oneshot(get("/api/v1/books")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_renew_checks_policy_before_reading_request() {
        let id = Uuid::new_v4();
        let renew_uri = format!("/catalog/book/{}/renew/", id);
        let patron = bearer(vec![Capability::ViewBorrowed]);

        let response = app(Mocks::default())
            .oneshot(post(&renew_uri, Some(&patron), Some(r#"{"renewal_date":"not-a-date"}"#)))
            .await
            .unwrap();
        assert_error(response, StatusCode::FORBIDDEN, 3).await;

        let response = app(Mocks::default())
            .oneshot(post(&renew_uri, None, None))
            .await
            .unwrap();
        assert_error(response, StatusCode::UNAUTHORIZED, 2).await;

        let response = app(Mocks::default())
            .oneshot(get("/catalog/book/not-a-uuid/renew/"))
            .await
            .unwrap();
        assert_error(response, StatusCode::UNAUTHORIZED, 2).await;

        let response = app(Mocks::default())
            .oneshot(post("/catalog/book/not-a-uuid/renew/", Some(&patron), None))
            .await
            .unwrap();
        assert_error(response, StatusCode::FORBIDDEN, 3).await;
    }

    #[tokio::test]
    async fn test_renew_malformed_id_is_not_found() {
        let mut mocks = Mocks::default();
        mocks.book_instances.expect_get_by_id().never();

        let response = app(mocks)
            .oneshot(get_as(
                "/catalog/book/not-a-uuid/renew/",
                &bearer(vec![Capability::MarkReturned]),
            ))
            .await
            .unwrap();
        assert_error(response, StatusCode::NOT_FOUND, 5).await;
    }

    #[tokio::test]
    async fn test_renew_without_readable_date_is_invalid_date() {
        let id = Uuid::new_v4();
        let librarian = bearer(vec![Capability::MarkReturned]);
        let renew_uri = format!("/catalog/book/{}/renew/", id);

        for body in [None, Some(r#"{"renewal_date":"2024-13-45"}"#)] {
            let mut mocks = Mocks::default();
            mocks
                .book_instances
                .expect_get_by_id()
                .with(eq(id))
                .returning(|id| Ok(on_loan(id)));
            mocks.book_instances.expect_update_due_back().never();

            let response = app(mocks)
                .oneshot(post(&renew_uri, Some(&librarian), body))
                .await
                .unwrap();
            assert_error(response, StatusCode::BAD_REQUEST, 6).await;
        }
    }

    #[tokio::test]
    async fn test_author_create_requires_view_borrowed() {
        let author = r#"{"first_name":"Octavia","last_name":"Butler","date_of_birth":"1947-06-22","date_of_death":"2006-02-24"}"#;

        let response = app(Mocks::default())
            .oneshot(post("/catalog/author/create/", None, Some(author)))
            .await
            .unwrap();
        assert_error(response, StatusCode::UNAUTHORIZED, 2).await;

        let response = app(Mocks::default())
            .oneshot(post("/catalog/author/create/", Some(&bearer(vec![])), Some("{")))
            .await
            .unwrap();
        assert_error(response, StatusCode::FORBIDDEN, 3).await;

        let mut mocks = Mocks::default();
        mocks.authors.expect_create().times(1).returning(|input| {
            Ok(Author {
                id: 11,
                first_name: input.first_name.clone(),
                last_name: input.last_name.clone(),
                date_of_birth: input.date_of_birth,
                date_of_death: input.date_of_death,
            })
        });
        let response = app(mocks)
            .oneshot(post(
                "/catalog/author/create/",
                Some(&bearer(vec![Capability::ViewBorrowed])),
                Some(author),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(json_body(response).await["last_name"], "Butler");
    }

    #[tokio::test]
    async fn test_book_update_requires_view_borrowed() {
        let book = r#"{"title":"Dune","summary":"Arrakis","isbn":"9780441172719","genre":[]}"#;

        let response = app(Mocks::default())
            .oneshot(post("/catalog/book/5/update/", None, Some(book)))
            .await
            .unwrap();
        assert_error(response, StatusCode::UNAUTHORIZED, 2).await;

        let response = app(Mocks::default())
            .oneshot(post("/catalog/book/5/update/", Some(&bearer(vec![])), Some(book)))
            .await
            .unwrap();
        assert_error(response, StatusCode::FORBIDDEN, 3).await;

        let librarian = bearer(vec![Capability::ViewBorrowed]);
        let response = app(Mocks::default())
            .oneshot(post("/catalog/book/5/update/", Some(&librarian), Some(r#"{"title":"Dune"}"#)))
            .await
            .unwrap();
        assert_error(response, StatusCode::BAD_REQUEST, 7).await;

        let mut mocks = Mocks::default();
        mocks.books.expect_get_by_id().with(eq(5)).returning(|_| Ok(dune()));
        mocks
            .books
            .expect_isbn_exists()
            .withf(|isbn, exclude| isbn == "9780441172719" && *exclude == Some(5))
            .returning(|_, _| Ok(false));
        mocks
            .books
            .expect_update()
            .times(1)
            .returning(|_, _| Ok(dune()));
        let response = app(mocks)
            .oneshot(post("/catalog/book/5/update/", Some(&librarian), Some(book)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["title"], "Dune");
    }

    #[tokio::test]
    async fn test_book_delete_requires_view_borrowed() {
        let response = app(Mocks::default())
            .oneshot(post("/catalog/book/5/delete/", None, None))
            .await
            .unwrap();
        assert_error(response, StatusCode::UNAUTHORIZED, 2).await;

        let mut mocks = Mocks::default();
        mocks.books.expect_delete().never();
        let response = app(mocks)
            .oneshot(post("/catalog/book/5/delete/", Some(&bearer(vec![])), None))
            .await
            .unwrap();
        assert_error(response, StatusCode::FORBIDDEN, 3).await;

        let mut mocks = Mocks::default();
        mocks.books.expect_delete().with(eq(5)).times(1).returning(|_| Ok(()));
        let response = app(mocks)
            .oneshot(post(
                "/catalog/book/5/delete/",
                Some(&bearer(vec![Capability::ViewBorrowed])),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["redirect_to"], "/catalog/books/");
    }
}
