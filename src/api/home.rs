//! Home page summary and the hello endpoint

use axum::{
    extract::{Query, State},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{error::AppResult, services::catalog::CatalogCounts, AppState};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HomeQuery {
    /// Genre-name fragment to count (default: `catalog.featured_genre`)
    pub genre: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct HomeResponse {
    #[serde(flatten)]
    pub counts: CatalogCounts,
    /// Visits of the current session, this one included
    pub num_visits: u64,
    pub site_token: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct HelloResponse {
    pub message: String,
}

/// Session id from the cookie jar, or a fresh one added to the jar
fn session_id(jar: CookieJar, cookie_name: &str) -> (CookieJar, String) {
    let existing = jar
        .get(cookie_name)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok());

    match existing {
        Some(id) => (jar, id.to_string()),
        None => {
            let id = Uuid::new_v4().to_string();
            let cookie = Cookie::build((cookie_name.to_string(), id.clone()))
                .path("/")
                .http_only(true);
            (jar.add(cookie), id)
        }
    }
}

/// Catalog home page: record counts and the session visit counter
#[utoipa::path(
    get,
    path = "/catalog/",
    tag = "catalog",
    params(HomeQuery),
    responses(
        (status = 200, description = "Catalog summary", body = HomeResponse)
    )
)]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<HomeQuery>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<HomeResponse>)> {
    let genre = query
        .genre
        .filter(|g| !g.trim().is_empty())
        .unwrap_or_else(|| state.config.catalog.featured_genre.clone());

    let counts = state.services.catalog.counts(&genre).await?;

    let (jar, session) = session_id(jar, &state.config.sessions.cookie_name);
    let num_visits = state.services.sessions.record_visit(&session).await?;

    Ok((
        jar,
        Json(HomeResponse {
            counts,
            num_visits,
            site_token: state.site_token.as_deref().map(str::to_string),
        }),
    ))
}

/// Hello endpoint
#[utoipa::path(
    get,
    path = "/api/1",
    tag = "catalog",
    responses(
        (status = 200, description = "Greeting", body = HelloResponse)
    )
)]
pub async fn hello() -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Hello World!".to_string(),
    })
}
