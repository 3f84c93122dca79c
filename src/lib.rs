//! LocalLibrary catalog server
//!
//! A Rust REST JSON server for a small lending library: books, authors,
//! genres and their loanable copies, with a due-date renewal workflow and
//! capability-gated staff views.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod policy;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
    /// Site token resolved from `site.token_file` at start-up
    pub site_token: Option<Arc<str>>,
}
