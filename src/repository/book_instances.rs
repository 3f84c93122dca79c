//! Book instances (copies) repository for database operations

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{BookInstance, BorrowedCopy, BorrowedOrder, LoanStatus},
};

use super::BookInstancesRepository;

const INSTANCE_COLUMNS: &str = "id, book_id, imprint, due_back, borrower_id, status, created_at";

#[derive(Clone)]
pub struct PgBookInstancesRepository {
    pool: Pool<Postgres>,
}

impl PgBookInstancesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookInstancesRepository for PgBookInstancesRepository {
    async fn get_by_id(&self, id: Uuid) -> AppResult<BookInstance> {
        let query = format!("SELECT {} FROM book_instances WHERE id = $1", INSTANCE_COLUMNS);
        sqlx::query_as::<_, BookInstance>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    async fn list_for_book(&self, book_id: i64) -> AppResult<Vec<BookInstance>> {
        let query = format!(
            "SELECT {} FROM book_instances WHERE book_id = $1 ORDER BY created_at, id",
            INSTANCE_COLUMNS
        );
        let copies = sqlx::query_as::<_, BookInstance>(&query)
            .bind(book_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(copies)
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_instances")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_by_status(&self, status: LoanStatus) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_instances WHERE status = $1")
            .bind(status.as_code())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_on_loan(&self, borrower_id: Option<i64>) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM book_instances
            WHERE status = $1 AND ($2::bigint IS NULL OR borrower_id = $2)
            "#,
        )
        .bind(LoanStatus::OnLoan.as_code())
        .bind(borrower_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn list_on_loan(
        &self,
        borrower_id: Option<i64>,
        order: BorrowedOrder,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<BorrowedCopy>> {
        let query = format!(
            r#"
            SELECT bi.id, bi.book_id, b.title AS book_title, bi.imprint, bi.due_back,
                   bi.borrower_id, u.username AS borrower_username
            FROM book_instances bi
            JOIN books b ON b.id = bi.book_id
            LEFT JOIN users u ON u.id = bi.borrower_id
            WHERE bi.status = $1 AND ($2::bigint IS NULL OR bi.borrower_id = $2)
            ORDER BY {}
            LIMIT $3 OFFSET $4
            "#,
            order.as_sql()
        );
        let copies = sqlx::query_as::<_, BorrowedCopy>(&query)
            .bind(LoanStatus::OnLoan.as_code())
            .bind(borrower_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(copies)
    }

    async fn update_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<BookInstance> {
        let query = format!(
            "UPDATE book_instances SET due_back = $2 WHERE id = $1 AND status = $3 RETURNING {}",
            INSTANCE_COLUMNS
        );
        sqlx::query_as::<_, BookInstance>(&query)
            .bind(id)
            .bind(due_back)
            .bind(LoanStatus::OnLoan.as_code())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_on_loan(id))
    }
}
