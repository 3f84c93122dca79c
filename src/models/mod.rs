//! Data models for the library catalog

pub mod author;
pub mod book;
pub mod book_instance;
pub mod genre;
pub mod pagination;
pub mod user;

// Re-export commonly used types
pub use author::{Author, AuthorDetail, AuthorInput};
pub use book::{Book, BookDetail, BookInput};
pub use book_instance::{BookInstance, BorrowedCopy, BorrowedOrder, LoanStatus};
pub use genre::{Genre, GenreInput};
pub use pagination::{Page, PageQuery, Pagination};
pub use user::{Capability, Group, GroupInput, User, UserClaims, UserInput};
