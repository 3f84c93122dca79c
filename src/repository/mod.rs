//! Repository layer for database operations
//!
//! Each catalog table is reached through a trait so services can be tested
//! against mocks; the `Pg*` types are the PostgreSQL implementations.

pub mod authors;
pub mod book_instances;
pub mod books;
pub mod genres;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        Author, AuthorInput, Book, BookInput, BookInstance, BorrowedCopy, BorrowedOrder, Genre,
        GenreInput, Group, GroupInput, LoanStatus, User, UserInput,
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenresRepository: Send + Sync {
    async fn list(&self, limit: i64, offset: i64) -> AppResult<Vec<Genre>>;
    async fn count(&self) -> AppResult<i64>;
    async fn get_by_id(&self, id: i64) -> AppResult<Genre>;
    /// Genres among `ids`; unknown ids are skipped
    async fn get_many(&self, ids: Vec<i64>) -> AppResult<Vec<Genre>>;
    async fn create(&self, data: &GenreInput) -> AppResult<Genre>;
    async fn update(&self, id: i64, data: &GenreInput) -> AppResult<Genre>;
    async fn delete(&self, id: i64) -> AppResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthorsRepository: Send + Sync {
    async fn list(&self, limit: i64, offset: i64) -> AppResult<Vec<Author>>;
    async fn count(&self) -> AppResult<i64>;
    async fn get_by_id(&self, id: i64) -> AppResult<Author>;
    async fn create(&self, data: &AuthorInput) -> AppResult<Author>;
    async fn update(&self, id: i64, data: &AuthorInput) -> AppResult<Author>;
    async fn delete(&self, id: i64) -> AppResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BooksRepository: Send + Sync {
    async fn list(&self, limit: i64, offset: i64) -> AppResult<Vec<Book>>;
    async fn count(&self) -> AppResult<i64>;
    /// Books with at least one genre whose name contains `fragment`, ignoring case
    async fn count_by_genre_name(&self, fragment: &str) -> AppResult<i64>;
    async fn get_by_id(&self, id: i64) -> AppResult<Book>;
    async fn list_by_author(&self, author_id: i64) -> AppResult<Vec<Book>>;
    async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i64>) -> AppResult<bool>;
    async fn create(&self, data: &BookInput) -> AppResult<Book>;
    async fn update(&self, id: i64, data: &BookInput) -> AppResult<Book>;
    async fn delete(&self, id: i64) -> AppResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookInstancesRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<BookInstance>;
    async fn list_for_book(&self, book_id: i64) -> AppResult<Vec<BookInstance>>;
    async fn count(&self) -> AppResult<i64>;
    async fn count_by_status(&self, status: LoanStatus) -> AppResult<i64>;
    /// Count copies on loan, optionally only those held by `borrower_id`
    async fn count_on_loan(&self, borrower_id: Option<i64>) -> AppResult<i64>;
    /// Copies on loan, optionally only those held by `borrower_id`
    async fn list_on_loan(
        &self,
        borrower_id: Option<i64>,
        order: BorrowedOrder,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<BorrowedCopy>>;
    /// Overwrite `due_back` only, and only while the copy is on loan.
    /// A copy that is no longer on loan fails with `AppError::Validation`.
    async fn update_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<BookInstance>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn list(&self, limit: i64, offset: i64) -> AppResult<Vec<User>>;
    async fn count(&self) -> AppResult<i64>;
    async fn get_by_id(&self, id: i64) -> AppResult<User>;
    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn username_exists(&self, username: &str, exclude_id: Option<i64>) -> AppResult<bool>;
    /// Permission codenames granted directly or through groups
    async fn granted_codenames(&self, user_id: i64) -> AppResult<Vec<String>>;
    async fn create(&self, data: &UserInput, password_hash: Option<String>) -> AppResult<User>;
    async fn update(&self, id: i64, data: &UserInput, password_hash: Option<String>) -> AppResult<User>;
    async fn delete(&self, id: i64) -> AppResult<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupsRepository: Send + Sync {
    async fn list(&self, limit: i64, offset: i64) -> AppResult<Vec<Group>>;
    async fn count(&self) -> AppResult<i64>;
    async fn get_by_id(&self, id: i64) -> AppResult<Group>;
    /// Number of groups among `ids`
    async fn count_existing(&self, ids: Vec<i64>) -> AppResult<i64>;
    async fn create(&self, data: &GroupInput) -> AppResult<Group>;
    async fn update(&self, id: i64, data: &GroupInput) -> AppResult<Group>;
    async fn delete(&self, id: i64) -> AppResult<()>;
}

/// Main repository struct holding one repository per table
#[derive(Clone)]
pub struct Repository {
    pool: Option<Pool<Postgres>>,
    pub genres: Arc<dyn GenresRepository>,
    pub authors: Arc<dyn AuthorsRepository>,
    pub books: Arc<dyn BooksRepository>,
    pub book_instances: Arc<dyn BookInstancesRepository>,
    pub users: Arc<dyn UsersRepository>,
    pub groups: Arc<dyn GroupsRepository>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            genres: Arc::new(genres::PgGenresRepository::new(pool.clone())),
            authors: Arc::new(authors::PgAuthorsRepository::new(pool.clone())),
            books: Arc::new(books::PgBooksRepository::new(pool.clone())),
            book_instances: Arc::new(book_instances::PgBookInstancesRepository::new(pool.clone())),
            users: Arc::new(users::PgUsersRepository::new(pool.clone())),
            groups: Arc::new(users::PgGroupsRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Assemble a repository from individual implementations (no pool)
    pub fn from_parts(
        genres: Arc<dyn GenresRepository>,
        authors: Arc<dyn AuthorsRepository>,
        books: Arc<dyn BooksRepository>,
        book_instances: Arc<dyn BookInstancesRepository>,
        users: Arc<dyn UsersRepository>,
        groups: Arc<dyn GroupsRepository>,
    ) -> Self {
        Self {
            pool: None,
            genres,
            authors,
            books,
            book_instances,
            users,
            groups,
        }
    }

    /// Check database connectivity
    pub async fn ping(&self) -> AppResult<()> {
        let pool = self
            .pool
            .as_ref()
            .ok_or_else(|| AppError::Internal("No database pool configured".to_string()))?;
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}

/// Whether a query failed on a UNIQUE constraint
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

/// Escape `%`, `_` and `\` for use inside an ILIKE pattern
pub(crate) fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
