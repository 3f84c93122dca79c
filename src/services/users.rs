//! Authentication, user and group management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{Capability, Group, GroupInput, Page, Pagination, User, UserClaims, UserInput},
    repository::Repository,
};

/// Records per page in the REST collections
pub const API_PER_PAGE: i64 = 20;

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a password against a stored Argon2 hash
pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate by username and password and issue a JWT
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<(String, UserClaims)> {
        let user = self
            .repository
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

        let valid = match user.password.as_deref() {
            Some(hash) => verify_password(hash, password)?,
            None => false,
        };
        if !valid {
            tracing::warn!(username = %username, "Failed login attempt");
            return Err(AppError::Authentication("Invalid username or password".to_string()));
        }

        let now = Utc::now().timestamp();
        let claims = UserClaims {
            sub: user.username.clone(),
            user_id: user.id,
            capabilities: self.capabilities_for(&user).await?,
            exp: now + (self.config.jwt_expiration_hours as i64 * 3600),
            iat: now,
        };
        let token = claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok((token, claims))
    }

    /// Capabilities held directly, through groups, or as superuser
    pub async fn capabilities_for(&self, user: &User) -> AppResult<Vec<Capability>> {
        if user.is_superuser {
            return Ok(Capability::ALL.to_vec());
        }
        let granted = self.repository.users.granted_codenames(user.id).await?;
        Ok(Capability::ALL
            .into_iter()
            .filter(|c| granted.iter().any(|name| name == c.codename()))
            .collect())
    }

    // =========================================================================
    // USERS
    // =========================================================================

    /// Users, most recently joined first
    pub async fn list_users(&self, pagination: Pagination) -> AppResult<Page<User>> {
        let total = self.repository.users.count().await?;
        pagination.check(total)?;
        let users = self
            .repository
            .users
            .list(pagination.limit(), pagination.offset())
            .await?;
        Ok(Page::new(users, total, pagination))
    }

    pub async fn get_user(&self, id: i64) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    pub async fn create_user(&self, input: UserInput) -> AppResult<User> {
        input.validate()?;
        if self.repository.users.username_exists(&input.username, None).await? {
            return Err(AppError::Validation(format!(
                "Username '{}' is already taken",
                input.username
            )));
        }
        self.check_groups(&input.groups).await?;

        let hash = input.password.as_deref().map(hash_password).transpose()?;
        let user = self.repository.users.create(&input, hash).await?;
        tracing::info!(user_id = user.id, username = %user.username, "User created");
        Ok(user)
    }

    pub async fn update_user(&self, id: i64, input: UserInput) -> AppResult<User> {
        input.validate()?;
        if self.repository.users.username_exists(&input.username, Some(id)).await? {
            return Err(AppError::Validation(format!(
                "Username '{}' is already taken",
                input.username
            )));
        }
        self.check_groups(&input.groups).await?;

        let hash = input.password.as_deref().map(hash_password).transpose()?;
        let user = self.repository.users.update(id, &input, hash).await?;
        tracing::info!(user_id = id, "User updated");
        Ok(user)
    }

    pub async fn delete_user(&self, id: i64) -> AppResult<()> {
        self.repository.users.delete(id).await?;
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }

    async fn check_groups(&self, group_ids: &[i64]) -> AppResult<()> {
        let mut ids = group_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(());
        }
        let expected = ids.len() as i64;
        if self.repository.groups.count_existing(ids).await? != expected {
            return Err(AppError::Validation("Unknown group in 'groups'".to_string()));
        }
        Ok(())
    }

    // =========================================================================
    // GROUPS
    // =========================================================================

    pub async fn list_groups(&self, pagination: Pagination) -> AppResult<Page<Group>> {
        let total = self.repository.groups.count().await?;
        pagination.check(total)?;
        let groups = self
            .repository
            .groups
            .list(pagination.limit(), pagination.offset())
            .await?;
        Ok(Page::new(groups, total, pagination))
    }

    pub async fn get_group(&self, id: i64) -> AppResult<Group> {
        self.repository.groups.get_by_id(id).await
    }

    pub async fn create_group(&self, input: GroupInput) -> AppResult<Group> {
        input.validate()?;
        let group = self.repository.groups.create(&input).await?;
        tracing::info!(group_id = group.id, "Group created: {}", group.name);
        Ok(group)
    }

    pub async fn update_group(&self, id: i64, input: GroupInput) -> AppResult<Group> {
        input.validate()?;
        let group = self.repository.groups.update(id, &input).await?;
        tracing::info!(group_id = id, "Group updated");
        Ok(group)
    }

    pub async fn delete_group(&self, id: i64) -> AppResult<()> {
        self.repository.groups.delete(id).await?;
        tracing::info!(group_id = id, "Group deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mockall::predicate::eq;

    use super::*;
    use crate::repository::{
        MockAuthorsRepository, MockBookInstancesRepository, MockBooksRepository,
        MockGenresRepository, MockGroupsRepository, MockUsersRepository,
    };

    const SECRET: &str = "test-secret";

    fn service(users: MockUsersRepository, groups: MockGroupsRepository) -> UsersService {
        let repository = Repository::from_parts(
            Arc::new(MockGenresRepository::new()),
            Arc::new(MockAuthorsRepository::new()),
            Arc::new(MockBooksRepository::new()),
            Arc::new(MockBookInstancesRepository::new()),
            Arc::new(users),
            Arc::new(groups),
        );
        UsersService::new(
            repository,
            AuthConfig {
                jwt_secret: SECRET.to_string(),
                jwt_expiration_hours: 1,
            },
        )
    }

    fn user(password: &str, is_superuser: bool) -> User {
        User {
            id: 5,
            username: "librarian".to_string(),
            email: "librarian@example.org".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password: Some(hash_password(password).unwrap()),
            is_superuser,
            date_joined: Utc::now(),
            group_ids: vec![1],
        }
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("1X<ISRUkw+tuK").unwrap();
        assert!(verify_password(&hash, "1X<ISRUkw+tuK").unwrap());
        assert!(!verify_password(&hash, "wrong").unwrap());
    }

    #[tokio::test]
    async fn test_login_resolves_granted_capabilities() {
        let account = user("2HJ1vRV0Z&3iD", false);
        let mut users = MockUsersRepository::new();
        users
            .expect_get_by_username()
            .withf(|name| name == "librarian")
            .returning(move |_| Ok(Some(account.clone())));
        users
            .expect_granted_codenames()
            .with(eq(5))
            .returning(|_| Ok(vec!["catalog.can_mark_returned".to_string(), "catalog.add_book".to_string()]));

        let (token, claims) = service(users, MockGroupsRepository::new())
            .authenticate("librarian", "2HJ1vRV0Z&3iD")
            .await
            .unwrap();

        assert_eq!(claims.capabilities, vec![Capability::MarkReturned]);
        assert_eq!(UserClaims::from_token(&token, SECRET).unwrap(), claims);
    }

    #[tokio::test]
    async fn test_superuser_holds_every_capability() {
        let admin = user("pw", true);
        let mut users = MockUsersRepository::new();
        users.expect_granted_codenames().never();

        let capabilities = service(users, MockGroupsRepository::new())
            .capabilities_for(&admin)
            .await
            .unwrap();
        assert_eq!(capabilities, Capability::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let account = user("right", false);
        let mut users = MockUsersRepository::new();
        users
            .expect_get_by_username()
            .returning(move |_| Ok(Some(account.clone())));

        let result = service(users, MockGroupsRepository::new())
            .authenticate("librarian", "wrong")
            .await;
        assert!(matches!(result, Err(AppError::Authentication(_))));
    }

    #[tokio::test]
    async fn test_unknown_user_rejected() {
        let mut users = MockUsersRepository::new();
        users.expect_get_by_username().returning(|_| Ok(None));

        let result = service(users, MockGroupsRepository::new())
            .authenticate("nobody", "pw")
            .await;
        assert!(matches!(result, Err(AppError::Authentication(_))));
    }

    #[tokio::test]
    async fn test_create_user_with_unknown_group_rejected() {
        let mut users = MockUsersRepository::new();
        users.expect_username_exists().returning(|_, _| Ok(false));
        users.expect_create().never();
        let mut groups = MockGroupsRepository::new();
        groups
            .expect_count_existing()
            .with(eq(vec![1, 2]))
            .returning(|_| Ok(1));

        let input = UserInput {
            username: "patron".to_string(),
            email: None,
            password: Some("secret".to_string()),
            groups: vec![2, 1, 2],
        };
        let result = service(users, groups).create_user(input).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_user_hashes_password() {
        let mut users = MockUsersRepository::new();
        users.expect_username_exists().returning(|_, _| Ok(false));
        users
            .expect_create()
            .withf(|_, hash| {
                hash.as_deref()
                    .map(|h| verify_password(h, "secret").unwrap_or(false))
                    .unwrap_or(false)
            })
            .returning(|input, hash| {
                Ok(User {
                    id: 8,
                    username: input.username.clone(),
                    email: String::new(),
                    first_name: String::new(),
                    last_name: String::new(),
                    password: hash,
                    is_superuser: false,
                    date_joined: Utc::now(),
                    group_ids: vec![],
                })
            });

        let input = UserInput {
            username: "patron".to_string(),
            email: Some("patron@example.org".to_string()),
            password: Some("secret".to_string()),
            groups: vec![],
        };
        let created = service(users, MockGroupsRepository::new())
            .create_user(input)
            .await
            .unwrap();
        assert_eq!(created.id, 8);
    }
}
