//! Catalog service: books, authors and genres

use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        Author, AuthorDetail, AuthorInput, Book, BookDetail, BookInput, Genre, GenreInput,
        LoanStatus, Page, Pagination,
    },
    repository::Repository,
};

/// Books per page in the catalog book list
pub const BOOKS_PER_PAGE: i64 = 3;
/// Authors per page in the catalog author list
pub const AUTHORS_PER_PAGE: i64 = 5;

/// Record counts shown on the home page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CatalogCounts {
    pub num_books: i64,
    pub num_instances: i64,
    pub num_instances_available: i64,
    pub num_authors: i64,
    /// Genre-name fragment used for `num_genre_books`
    pub genre: String,
    /// Books with a genre whose name contains `genre`, ignoring case
    pub num_genre_books: i64,
}

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Home page counts
    pub async fn counts(&self, genre: &str) -> AppResult<CatalogCounts> {
        let repo = &self.repository;
        Ok(CatalogCounts {
            num_books: repo.books.count().await?,
            num_instances: repo.book_instances.count().await?,
            num_instances_available: repo.book_instances.count_by_status(LoanStatus::Available).await?,
            num_authors: repo.authors.count().await?,
            genre: genre.to_string(),
            num_genre_books: repo.books.count_by_genre_name(genre).await?,
        })
    }

    // =========================================================================
    // BOOKS
    // =========================================================================

    pub async fn list_books(&self, pagination: Pagination) -> AppResult<Page<Book>> {
        let total = self.repository.books.count().await?;
        pagination.check(total)?;
        let books = self
            .repository
            .books
            .list(pagination.limit(), pagination.offset())
            .await?;
        Ok(Page::new(books, total, pagination))
    }

    pub async fn get_book(&self, id: i64) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Book with its author, genres and copies
    pub async fn get_book_detail(&self, id: i64) -> AppResult<BookDetail> {
        let book = self.repository.books.get_by_id(id).await?;
        let author = match book.author_id {
            Some(author_id) => Some(self.repository.authors.get_by_id(author_id).await?),
            None => None,
        };
        let genres = self.repository.genres.get_many(book.genre_ids.clone()).await?;
        let copies = self.repository.book_instances.list_for_book(id).await?;

        Ok(BookDetail {
            book,
            author,
            genres,
            copies,
        })
    }

    pub async fn create_book(&self, input: BookInput) -> AppResult<Book> {
        input.validate()?;
        self.check_book_references(&input).await?;
        if self.repository.books.isbn_exists(&input.isbn, None).await? {
            return Err(AppError::Validation(format!(
                "Book with ISBN {} already exists",
                input.isbn
            )));
        }

        let book = self.repository.books.create(&input).await?;
        tracing::info!(book_id = book.id, isbn = %book.isbn, "Book created");
        Ok(book)
    }

    pub async fn update_book(&self, id: i64, input: BookInput) -> AppResult<Book> {
        input.validate()?;
        self.repository.books.get_by_id(id).await?;
        self.check_book_references(&input).await?;
        if self.repository.books.isbn_exists(&input.isbn, Some(id)).await? {
            return Err(AppError::Validation(format!(
                "Book with ISBN {} already exists",
                input.isbn
            )));
        }

        let book = self.repository.books.update(id, &input).await?;
        tracing::info!(book_id = id, "Book updated");
        Ok(book)
    }

    pub async fn delete_book(&self, id: i64) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }

    /// Referenced author and genres must exist
    async fn check_book_references(&self, input: &BookInput) -> AppResult<()> {
        if let Some(author_id) = input.author {
            match self.repository.authors.get_by_id(author_id).await {
                Ok(_) => {}
                Err(AppError::NotFound(_)) => {
                    return Err(AppError::Validation(format!(
                        "Author {} does not exist",
                        author_id
                    )))
                }
                Err(e) => return Err(e),
            }
        }

        let genre_ids = input.genre_ids();
        if !genre_ids.is_empty() {
            let found = self.repository.genres.get_many(genre_ids.clone()).await?;
            if found.len() != genre_ids.len() {
                let missing: Vec<String> = genre_ids
                    .iter()
                    .filter(|id| !found.iter().any(|g| g.id == **id))
                    .map(|id| id.to_string())
                    .collect();
                return Err(AppError::Validation(format!(
                    "Unknown genre(s): {}",
                    missing.join(", ")
                )));
            }
        }
        Ok(())
    }

    // =========================================================================
    // AUTHORS
    // =========================================================================

    pub async fn list_authors(&self, pagination: Pagination) -> AppResult<Page<Author>> {
        let total = self.repository.authors.count().await?;
        pagination.check(total)?;
        let authors = self
            .repository
            .authors
            .list(pagination.limit(), pagination.offset())
            .await?;
        Ok(Page::new(authors, total, pagination))
    }

    pub async fn get_author(&self, id: i64) -> AppResult<Author> {
        self.repository.authors.get_by_id(id).await
    }

    /// Author with the books that reference them
    pub async fn get_author_detail(&self, id: i64) -> AppResult<AuthorDetail> {
        let author = self.repository.authors.get_by_id(id).await?;
        let works = self.repository.books.list_by_author(id).await?;
        Ok(AuthorDetail { author, works })
    }

    pub async fn create_author(&self, input: AuthorInput) -> AppResult<Author> {
        input.validate()?;
        let author = self.repository.authors.create(&input).await?;
        tracing::info!(author_id = author.id, "Author created: {}", author.display_name());
        Ok(author)
    }

    pub async fn update_author(&self, id: i64, input: AuthorInput) -> AppResult<Author> {
        input.validate()?;
        let author = self.repository.authors.update(id, &input).await?;
        tracing::info!(author_id = id, "Author updated");
        Ok(author)
    }

    pub async fn delete_author(&self, id: i64) -> AppResult<()> {
        self.repository.authors.delete(id).await?;
        tracing::info!(author_id = id, "Author deleted");
        Ok(())
    }

    // =========================================================================
    // GENRES
    // =========================================================================

    pub async fn list_genres(&self, pagination: Pagination) -> AppResult<Page<Genre>> {
        let total = self.repository.genres.count().await?;
        pagination.check(total)?;
        let genres = self
            .repository
            .genres
            .list(pagination.limit(), pagination.offset())
            .await?;
        Ok(Page::new(genres, total, pagination))
    }

    pub async fn get_genre(&self, id: i64) -> AppResult<Genre> {
        self.repository.genres.get_by_id(id).await
    }

    pub async fn create_genre(&self, input: GenreInput) -> AppResult<Genre> {
        input.validate()?;
        let genre = self.repository.genres.create(&input).await?;
        tracing::info!(genre_id = genre.id, "Genre created: {}", genre.name);
        Ok(genre)
    }

    pub async fn update_genre(&self, id: i64, input: GenreInput) -> AppResult<Genre> {
        input.validate()?;
        let genre = self.repository.genres.update(id, &input).await?;
        tracing::info!(genre_id = id, "Genre updated");
        Ok(genre)
    }

    pub async fn delete_genre(&self, id: i64) -> AppResult<()> {
        self.repository.genres.delete(id).await?;
        tracing::info!(genre_id = id, "Genre deleted");
        Ok(())
    }
}
