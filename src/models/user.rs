//! User, group and capability types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Fine-grained capabilities granted to users or groups out of band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Capability {
    /// See every copy on loan; also gates author and book edits
    #[serde(rename = "catalog.can_view_borrowed")]
    ViewBorrowed,
    /// Renew (and mark returned) loaned copies
    #[serde(rename = "catalog.can_mark_returned")]
    MarkReturned,
}

impl Capability {
    pub const ALL: [Capability; 2] = [Capability::ViewBorrowed, Capability::MarkReturned];

    /// Permission codename as stored in the grant tables
    pub fn codename(&self) -> &'static str {
        match self {
            Capability::ViewBorrowed => "catalog.can_view_borrowed",
            Capability::MarkReturned => "catalog.can_mark_returned",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.codename())
    }
}

impl std::str::FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|c| c.codename() == s)
            .ok_or_else(|| format!("Unknown capability: {}", s))
    }
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
    pub group_ids: Vec<i64>,
}

/// Create / update user request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UserInput {
    #[validate(length(min = 1, max = 150, message = "Username must be 1 to 150 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    /// New password; left unchanged on update when omitted
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: Option<String>,
    #[serde(default)]
    pub groups: Vec<i64>,
}

/// User group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Group {
    pub id: i64,
    pub name: String,
}

/// Create / update group request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct GroupInput {
    #[validate(length(min = 1, max = 150, message = "Group name must be 1 to 150 characters"))]
    pub name: String,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    /// Username
    pub sub: String,
    pub user_id: i64,
    /// Capabilities resolved at login
    pub capabilities: Vec<Capability>,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}
