//! Library management server
//!
//! REST JSON API for a small library: book and category catalogs, user
//! accounts, and borrowing requests that super users approve or reject.
//! Every command runs in a single transaction that also appends to the
//! activity log.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
