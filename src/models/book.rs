//! Book model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::{author::Author, book_instance::BookInstance, genre::Genre};

/// Book (title-level record, not a specific copy)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i64,
    pub title: String,
    /// Author reference, cleared when the author is deleted
    pub author_id: Option<i64>,
    pub summary: String,
    /// 13 character ISBN, unique across the catalog
    pub isbn: String,
    /// Genre references
    pub genre_ids: Vec<i64>,
}

/// Book with its resolved references and copies
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetail {
    pub book: Book,
    pub author: Option<Author>,
    pub genres: Vec<Genre>,
    pub copies: Vec<BookInstance>,
}

/// Create / update book request
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct BookInput {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,
    pub author: Option<i64>,
    #[validate(length(max = 1000, message = "Summary must be at most 1000 characters"))]
    #[serde(default)]
    pub summary: String,
    #[validate(length(equal = 13, message = "ISBN must be exactly 13 characters"))]
    pub isbn: String,
    #[serde(default)]
    pub genre: Vec<i64>,
}

impl BookInput {
    /// Initial values offered by the book creation form
    pub fn initial() -> Self {
        Self {
            title: String::new(),
            author: None,
            summary: "Summary".to_string(),
            isbn: String::new(),
            genre: Vec::new(),
        }
    }

    /// Genre ids without duplicates, in ascending order
    pub fn genre_ids(&self) -> Vec<i64> {
        let mut ids = self.genre.clone();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

impl From<&Book> for BookInput {
    fn from(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author_id,
            summary: book.summary.clone(),
            isbn: book.isbn.clone(),
            genre: book.genre_ids.clone(),
        }
    }
}
