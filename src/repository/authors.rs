//! Authors repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{Author, AuthorInput},
};

use super::AuthorsRepository;

const AUTHOR_COLUMNS: &str = "id, first_name, last_name, date_of_birth, date_of_death";

#[derive(Clone)]
pub struct PgAuthorsRepository {
    pool: Pool<Postgres>,
}

impl PgAuthorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorsRepository for PgAuthorsRepository {
    async fn list(&self, limit: i64, offset: i64) -> AppResult<Vec<Author>> {
        let query = format!(
            "SELECT {} FROM authors ORDER BY last_name, first_name, id LIMIT $1 OFFSET $2",
            AUTHOR_COLUMNS
        );
        let authors = sqlx::query_as::<_, Author>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(authors)
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM authors")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn get_by_id(&self, id: i64) -> AppResult<Author> {
        let query = format!("SELECT {} FROM authors WHERE id = $1", AUTHOR_COLUMNS);
        sqlx::query_as::<_, Author>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    async fn create(&self, data: &AuthorInput) -> AppResult<Author> {
        let query = format!(
            r#"
            INSERT INTO authors (first_name, last_name, date_of_birth, date_of_death)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            AUTHOR_COLUMNS
        );
        let author = sqlx::query_as::<_, Author>(&query)
            .bind(&data.first_name)
            .bind(&data.last_name)
            .bind(data.date_of_birth)
            .bind(data.date_of_death)
            .fetch_one(&self.pool)
            .await?;
        Ok(author)
    }

    async fn update(&self, id: i64, data: &AuthorInput) -> AppResult<Author> {
        let query = format!(
            r#"
            UPDATE authors
            SET first_name = $2, last_name = $3, date_of_birth = $4, date_of_death = $5
            WHERE id = $1
            RETURNING {}
            "#,
            AUTHOR_COLUMNS
        );
        sqlx::query_as::<_, Author>(&query)
            .bind(id)
            .bind(&data.first_name)
            .bind(&data.last_name)
            .bind(data.date_of_birth)
            .bind(data.date_of_death)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        // books.author_id is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Author with id {} not found", id)));
        }
        Ok(())
    }
}
