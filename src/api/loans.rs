//! Borrowed-copy views and the renewal form

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{BorrowedCopy, BorrowedOrder, Capability, Page, PageQuery, Pagination},
    policy,
    services::loans::{RenewalForm, RenewedCopy, BORROWED_PER_PAGE},
    AppState,
};

use super::{record_id, CurrentUser};

const COPY: &str = "Book instance";

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BorrowedQuery {
    /// Page number (default: 1)
    pub page: Option<i64>,
    /// `due_back` for earliest due date first (default: insertion order)
    #[serde(default)]
    pub sort: BorrowedOrder,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RenewRequest {
    /// New due date, between today and four weeks from today
    pub renewal_date: NaiveDate,
}

/// Copies on loan to the current user
#[utoipa::path(
    get,
    path = "/catalog/mybooks/",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Copies borrowed by the caller", body = Page<BorrowedCopy>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_borrowed(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<BorrowedCopy>>> {
    let page = state
        .services
        .loans
        .my_borrowed(current.principal(), Pagination::new(query, BORROWED_PER_PAGE))
        .await?;
    Ok(Json(page))
}

/// Every copy on loan
#[utoipa::path(
    get,
    path = "/catalog/borrowed",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(BorrowedQuery),
    responses(
        (status = 200, description = "All borrowed copies", body = Page<BorrowedCopy>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing catalog.can_view_borrowed")
    )
)]
pub async fn all_borrowed(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<BorrowedQuery>,
) -> AppResult<Json<Page<BorrowedCopy>>> {
    let pagination = Pagination::new(PageQuery { page: query.page }, BORROWED_PER_PAGE);
    let page = state
        .services
        .loans
        .all_borrowed(current.principal(), query.sort, pagination)
        .await?;
    Ok(Json(page))
}

/// Copy to renew, with a proposed due date three weeks out
#[utoipa::path(
    get,
    path = "/catalog/book/{id}/renew/",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book instance ID")),
    responses(
        (status = 200, description = "Renewal form", body = RenewalForm),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing catalog.can_mark_returned"),
        (status = 404, description = "Book instance not found")
    )
)]
pub async fn renewal_form(
    State(state): State<AppState>,
    current: CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<RenewalForm>> {
    policy::require_capability(current.principal(), Capability::MarkReturned)?;
    let id = record_id(id, COPY)?;
    let form = state
        .services
        .loans
        .renewal_form(id, current.principal())
        .await?;
    Ok(Json(form))
}

/// Set a new due date on a borrowed copy
#[utoipa::path(
    post,
    path = "/catalog/book/{id}/renew/",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book instance ID")),
    request_body = RenewRequest,
    responses(
        (status = 200, description = "Loan renewed", body = RenewedCopy),
        (status = 400, description = "Date missing, out of range, or copy not on loan"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing catalog.can_mark_returned"),
        (status = 404, description = "Book instance not found")
    )
)]
pub async fn renew_copy(
    State(state): State<AppState>,
    current: CurrentUser,
    id: Result<Path<Uuid>, PathRejection>,
    request: Result<Json<RenewRequest>, JsonRejection>,
) -> AppResult<Json<RenewedCopy>> {
    policy::require_capability(current.principal(), Capability::MarkReturned)?;
    let id = record_id(id, COPY)?;
    // An unreadable body carries no date
    let renewal_date = request.ok().map(|Json(request)| request.renewal_date);
    let renewed = state
        .services
        .loans
        .renew(id, renewal_date, current.principal())
        .await?;
    Ok(Json(renewed))
}
