//! Genre model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Book genre (e.g. Science Fiction, French Poetry)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// Create / update genre request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct GenreInput {
    #[validate(length(min = 1, max = 200, message = "Genre name must be 1 to 200 characters"))]
    pub name: String,
}
