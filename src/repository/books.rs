//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookInput},
};

use super::{escape_like, is_unique_violation, BooksRepository};

/// Book columns with genre ids aggregated from the link table
const BOOK_SELECT: &str = r#"
    SELECT b.id, b.title, b.author_id, b.summary, b.isbn,
           COALESCE(
               ARRAY_AGG(bg.genre_id ORDER BY bg.genre_id) FILTER (WHERE bg.genre_id IS NOT NULL),
               '{}'
           ) AS genre_ids
    FROM books b
    LEFT JOIN book_genres bg ON bg.book_id = b.id
"#;

/// Map a violation of the unique ISBN constraint to a validation error
fn map_isbn_violation(e: sqlx::Error, isbn: &str) -> AppError {
    if is_unique_violation(&e) {
        AppError::Validation(format!("Book with ISBN {} already exists", isbn))
    } else {
        AppError::Database(e)
    }
}

#[derive(Clone)]
pub struct PgBooksRepository {
    pool: Pool<Postgres>,
}

impl PgBooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Replace the genre links of a book
    async fn set_genres(
        tx: &mut Transaction<'_, Postgres>,
        book_id: i64,
        genre_ids: &[i64],
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM book_genres WHERE book_id = $1")
            .bind(book_id)
            .execute(&mut **tx)
            .await?;

        if !genre_ids.is_empty() {
            sqlx::query(
                "INSERT INTO book_genres (book_id, genre_id) SELECT $1, UNNEST($2::bigint[])",
            )
            .bind(book_id)
            .bind(genre_ids)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BooksRepository for PgBooksRepository {
    async fn list(&self, limit: i64, offset: i64) -> AppResult<Vec<Book>> {
        let query = format!("{} GROUP BY b.id ORDER BY b.id LIMIT $1 OFFSET $2", BOOK_SELECT);
        let books = sqlx::query_as::<_, Book>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_by_genre_name(&self, fragment: &str) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT bg.book_id)
            FROM book_genres bg
            JOIN genres g ON g.id = bg.genre_id
            WHERE g.name ILIKE '%' || $1 || '%' ESCAPE '\'
            "#,
        )
        .bind(escape_like(fragment))
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn get_by_id(&self, id: i64) -> AppResult<Book> {
        let query = format!("{} WHERE b.id = $1 GROUP BY b.id", BOOK_SELECT);
        sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn list_by_author(&self, author_id: i64) -> AppResult<Vec<Book>> {
        let query = format!(
            "{} WHERE b.author_id = $1 GROUP BY b.id ORDER BY b.title, b.id",
            BOOK_SELECT
        );
        let books = sqlx::query_as::<_, Book>(&query)
            .bind(author_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i64>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND ($2::bigint IS NULL OR id != $2))",
        )
        .bind(isbn)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create(&self, data: &BookInput) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO books (title, author_id, summary, isbn)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&data.title)
        .bind(data.author)
        .bind(&data.summary)
        .bind(&data.isbn)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_isbn_violation(e, &data.isbn))?;

        Self::set_genres(&mut tx, id, &data.genre_ids()).await?;
        tx.commit().await?;

        self.get_by_id(id).await
    }

    async fn update(&self, id: i64, data: &BookInput) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = $2, author_id = $3, summary = $4, isbn = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&data.title)
        .bind(data.author)
        .bind(&data.summary)
        .bind(&data.isbn)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_isbn_violation(e, &data.isbn))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        Self::set_genres(&mut tx, id, &data.genre_ids()).await?;
        tx.commit().await?;

        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        // book_genres and book_instances cascade
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }
}
