//! Users and groups repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::{Group, GroupInput, User, UserInput},
};

use super::{is_unique_violation, GroupsRepository, UsersRepository};

/// User columns with group ids aggregated from the membership table
const USER_SELECT: &str = r#"
    SELECT u.id, u.username, u.email, u.first_name, u.last_name, u.password,
           u.is_superuser, u.date_joined,
           COALESCE(
               ARRAY_AGG(ug.group_id ORDER BY ug.group_id) FILTER (WHERE ug.group_id IS NOT NULL),
               '{}'
           ) AS group_ids
    FROM users u
    LEFT JOIN user_groups ug ON ug.user_id = u.id
"#;

#[derive(Clone)]
pub struct PgUsersRepository {
    pool: Pool<Postgres>,
}

impl PgUsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Replace the group memberships of a user
    async fn set_groups(
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
        group_ids: &[i64],
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM user_groups WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;

        if !group_ids.is_empty() {
            sqlx::query(
                "INSERT INTO user_groups (user_id, group_id) SELECT $1, UNNEST($2::bigint[]) ON CONFLICT DO NOTHING",
            )
            .bind(user_id)
            .bind(group_ids)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl UsersRepository for PgUsersRepository {
    async fn list(&self, limit: i64, offset: i64) -> AppResult<Vec<User>> {
        let query = format!(
            "{} GROUP BY u.id ORDER BY u.date_joined DESC, u.id DESC LIMIT $1 OFFSET $2",
            USER_SELECT
        );
        let users = sqlx::query_as::<_, User>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn get_by_id(&self, id: i64) -> AppResult<User> {
        let query = format!("{} WHERE u.id = $1 GROUP BY u.id", USER_SELECT);
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let query = format!("{} WHERE u.username = $1 GROUP BY u.id", USER_SELECT);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn username_exists(&self, username: &str, exclude_id: Option<i64>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND ($2::bigint IS NULL OR id != $2))",
        )
        .bind(username)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn granted_codenames(&self, user_id: i64) -> AppResult<Vec<String>> {
        let codenames: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT codename FROM user_permissions WHERE user_id = $1
            UNION
            SELECT gp.codename
            FROM group_permissions gp
            JOIN user_groups ug ON ug.group_id = gp.group_id
            WHERE ug.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(codenames)
    }

    async fn create(&self, data: &UserInput, password_hash: Option<String>) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, email, password)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&data.username)
        .bind(data.email.as_deref().unwrap_or(""))
        .bind(password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Validation(format!("Username '{}' is already taken", data.username))
            } else {
                AppError::Database(e)
            }
        })?;

        Self::set_groups(&mut tx, id, &data.groups).await?;
        tx.commit().await?;

        self.get_by_id(id).await
    }

    async fn update(&self, id: i64, data: &UserInput, password_hash: Option<String>) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, email = $3, password = COALESCE($4, password)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&data.username)
        .bind(data.email.as_deref().unwrap_or(""))
        .bind(password_hash)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Validation(format!("Username '{}' is already taken", data.username))
            } else {
                AppError::Database(e)
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }

        Self::set_groups(&mut tx, id, &data.groups).await?;
        tx.commit().await?;

        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        // borrowed copies keep their status; borrower_id is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgGroupsRepository {
    pool: Pool<Postgres>,
}

impl PgGroupsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupsRepository for PgGroupsRepository {
    async fn list(&self, limit: i64, offset: i64) -> AppResult<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            "SELECT id, name FROM groups ORDER BY id LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM groups")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn get_by_id(&self, id: i64) -> AppResult<Group> {
        sqlx::query_as::<_, Group>("SELECT id, name FROM groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group with id {} not found", id)))
    }

    async fn count_existing(&self, ids: Vec<i64>) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM groups WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create(&self, data: &GroupInput) -> AppResult<Group> {
        sqlx::query_as::<_, Group>("INSERT INTO groups (name) VALUES ($1) RETURNING id, name")
            .bind(&data.name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Validation(format!("Group '{}' already exists", data.name))
                } else {
                    AppError::Database(e)
                }
            })
    }

    async fn update(&self, id: i64, data: &GroupInput) -> AppResult<Group> {
        sqlx::query_as::<_, Group>("UPDATE groups SET name = $2 WHERE id = $1 RETURNING id, name")
            .bind(id)
            .bind(&data.name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Validation(format!("Group '{}' already exists", data.name))
                } else {
                    AppError::Database(e)
                }
            })?
            .ok_or_else(|| AppError::NotFound(format!("Group with id {} not found", id)))
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Group with id {} not found", id)));
        }
        Ok(())
    }
}
