//! Genres repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{Genre, GenreInput},
};

use super::GenresRepository;

/// Map a duplicate genre name to a validation error
fn map_duplicate_name(e: sqlx::Error, name: &str) -> AppError {
    if super::is_unique_violation(&e) {
        AppError::Validation(format!("Genre '{}' already exists", name))
    } else {
        AppError::Database(e)
    }
}

#[derive(Clone)]
pub struct PgGenresRepository {
    pool: Pool<Postgres>,
}

impl PgGenresRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GenresRepository for PgGenresRepository {
    async fn list(&self, limit: i64, offset: i64) -> AppResult<Vec<Genre>> {
        let genres = sqlx::query_as::<_, Genre>(
            "SELECT id, name FROM genres ORDER BY name, id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(genres)
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM genres")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn get_by_id(&self, id: i64) -> AppResult<Genre> {
        sqlx::query_as::<_, Genre>("SELECT id, name FROM genres WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Genre with id {} not found", id)))
    }

    async fn get_many(&self, ids: Vec<i64>) -> AppResult<Vec<Genre>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let genres = sqlx::query_as::<_, Genre>(
            "SELECT id, name FROM genres WHERE id = ANY($1) ORDER BY name, id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(genres)
    }

    async fn create(&self, data: &GenreInput) -> AppResult<Genre> {
        sqlx::query_as::<_, Genre>("INSERT INTO genres (name) VALUES ($1) RETURNING id, name")
            .bind(&data.name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_duplicate_name(e, &data.name))
    }

    async fn update(&self, id: i64, data: &GenreInput) -> AppResult<Genre> {
        sqlx::query_as::<_, Genre>(
            "UPDATE genres SET name = $2 WHERE id = $1 RETURNING id, name",
        )
        .bind(id)
        .bind(&data.name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_duplicate_name(e, &data.name))?
        .ok_or_else(|| AppError::NotFound(format!("Genre with id {} not found", id)))
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM genres WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Genre with id {} not found", id)));
        }
        Ok(())
    }
}
