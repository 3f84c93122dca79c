//! Author model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use super::book::Book;

/// Full author model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_death: Option<NaiveDate>,
}

impl Author {
    /// Display name, "Last, First"
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }
}

/// Author with the books that reference them
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthorDetail {
    pub author: Author,
    pub works: Vec<Book>,
}

/// Create / update author request
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[validate(schema(function = "validate_lifespan"))]
pub struct AuthorInput {
    #[validate(length(min = 1, max = 100, message = "First name must be 1 to 100 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name must be 1 to 100 characters"))]
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_death: Option<NaiveDate>,
}

impl AuthorInput {
    /// Initial values offered by the author creation form
    pub fn initial() -> Self {
        Self {
            first_name: String::new(),
            last_name: String::new(),
            date_of_birth: None,
            date_of_death: NaiveDate::from_ymd_opt(2020, 11, 6),
        }
    }
}

impl From<&Author> for AuthorInput {
    fn from(author: &Author) -> Self {
        Self {
            first_name: author.first_name.clone(),
            last_name: author.last_name.clone(),
            date_of_birth: author.date_of_birth,
            date_of_death: author.date_of_death,
        }
    }
}

fn validate_lifespan(input: &AuthorInput) -> Result<(), ValidationError> {
    match (input.date_of_birth, input.date_of_death) {
        (Some(born), Some(died)) if died < born => {
            let mut error = ValidationError::new("lifespan");
            error.message = Some("Date of death is before date of birth".into());
            Err(error)
        }
        _ => Ok(()),
    }
}
