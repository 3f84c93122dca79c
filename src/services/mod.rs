//! Business logic services

pub mod catalog;
pub mod loans;
pub mod redis;
pub mod sessions;
pub mod users;

use std::sync::Arc;

use chrono::NaiveDate;

use crate::{config::AuthConfig, error::AppResult, repository::Repository};

/// Source of "today" for date-sensitive rules
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date of the server
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub users: users::UsersService,
    pub sessions: Arc<dyn sessions::SessionStore>,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        auth_config: AuthConfig,
        sessions: Arc<dyn sessions::SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            loans: loans::LoansService::new(repository.clone(), clock),
            users: users::UsersService::new(repository.clone(), auth_config),
            sessions,
            repository,
        }
    }

    /// Check that the catalog store answers
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}
