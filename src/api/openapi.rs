//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, authors, books, health, home, loans, rest, users};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LocalLibrary API",
        version = "0.3.0",
        description = "Library catalog, loans and renewal REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    paths(
        // Catalog views
        home::index,
        home::hello,
        books::list_books,
        books::get_book,
        books::create_form,
        books::create_book,
        books::update_form,
        books::update_book,
        books::delete_confirm,
        books::delete_book,
        authors::list_authors,
        authors::get_author,
        authors::create_form,
        authors::create_author,
        authors::update_form,
        authors::update_author,
        authors::delete_confirm,
        authors::delete_author,
        // Loans
        loans::my_borrowed,
        loans::all_borrowed,
        loans::renewal_form,
        loans::renew_copy,
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::me,
        // Users and groups
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        users::list_groups,
        users::get_group,
        users::create_group,
        users::update_group,
        users::delete_group,
        // REST catalog
        rest::list_books,
        rest::get_book,
        rest::create_book,
        rest::update_book,
        rest::delete_book,
        rest::list_genres,
        rest::get_genre,
        rest::create_genre,
        rest::update_genre,
        rest::delete_genre,
        rest::list_authors,
        rest::get_author,
        rest::create_author,
        rest::update_author,
        rest::delete_author,
    ),
    components(
        schemas(
            // Catalog
            crate::models::Book,
            crate::models::BookDetail,
            crate::models::BookInput,
            crate::models::Author,
            crate::models::AuthorDetail,
            crate::models::AuthorInput,
            crate::models::Genre,
            crate::models::GenreInput,
            crate::models::BookInstance,
            crate::models::LoanStatus,
            crate::models::BorrowedCopy,
            crate::models::BorrowedOrder,
            crate::services::catalog::CatalogCounts,
            home::HomeResponse,
            home::HelloResponse,
            super::RedirectResponse,
            // Loans
            loans::RenewRequest,
            crate::services::loans::RenewalForm,
            crate::services::loans::RenewedCopy,
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::PrincipalInfo,
            crate::models::Capability,
            // REST resources
            users::UserResource,
            users::GroupResource,
            crate::models::UserInput,
            crate::models::GroupInput,
            rest::BookResource,
            rest::GenreResource,
            rest::AuthorResource,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "catalog", description = "Catalog views and edit forms"),
        (name = "loans", description = "Borrowed copies and renewals"),
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "users", description = "Users and groups"),
        (name = "books", description = "Book records"),
        (name = "genres", description = "Genre records"),
        (name = "authors", description = "Author records")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
