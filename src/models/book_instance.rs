//! Book instance (loanable copy) model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, FromRow, Postgres};
use utoipa::ToSchema;
use uuid::Uuid;

/// Loan status of a copy. Stored as a single character code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    #[default]
    Maintenance,
    OnLoan,
    Available,
    Reserved,
}

impl LoanStatus {
    /// Return the storage code for this status
    pub fn as_code(&self) -> &'static str {
        match self {
            LoanStatus::Maintenance => "m",
            LoanStatus::OnLoan => "o",
            LoanStatus::Available => "a",
            LoanStatus::Reserved => "r",
        }
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "m" => Ok(LoanStatus::Maintenance),
            "o" => Ok(LoanStatus::OnLoan),
            "a" => Ok(LoanStatus::Available),
            "r" => Ok(LoanStatus::Reserved),
            other => Err(format!("Invalid loan status code: {}", other)),
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_code())
    }
}

// SQLx conversion for LoanStatus (decode only, binds use `as_code`)
impl sqlx::Type<Postgres> for LoanStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for LoanStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

/// A physical, loanable copy of a book.
///
/// `due_back` and `borrower_id` are only set while `status` is `OnLoan`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookInstance {
    pub id: Uuid,
    pub book_id: i64,
    pub imprint: String,
    pub due_back: Option<NaiveDate>,
    pub borrower_id: Option<i64>,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
}

impl BookInstance {
    pub fn is_on_loan(&self) -> bool {
        self.status == LoanStatus::OnLoan
    }
}

/// On-loan copy as listed in the borrowed views
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
pub struct BorrowedCopy {
    pub id: Uuid,
    pub book_id: i64,
    pub book_title: String,
    pub imprint: String,
    pub due_back: Option<NaiveDate>,
    pub borrower_id: Option<i64>,
    pub borrower_username: Option<String>,
    #[sqlx(skip)]
    pub is_overdue: bool,
}

impl BorrowedCopy {
    /// Flag the copy as overdue when its due date is before `today`
    pub fn mark_overdue(mut self, today: NaiveDate) -> Self {
        self.is_overdue = self.due_back.map(|due| due < today).unwrap_or(false);
        self
    }
}

/// Ordering of the all-borrowed listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BorrowedOrder {
    /// Order in which the copies were added to the catalog
    #[default]
    Insertion,
    /// Earliest due date first
    DueBack,
}

impl BorrowedOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            BorrowedOrder::Insertion => "bi.created_at, bi.id",
            BorrowedOrder::DueBack => "bi.due_back ASC NULLS LAST, bi.created_at, bi.id",
        }
    }
}
