//! Business logic services

pub mod activity;
pub mod auth;
pub mod borrowings;
pub mod catalog;
pub mod users;

use crate::{
    config::{AuthConfig, BorrowingConfig},
    error::AppResult,
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub auth: auth::AuthService,
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub borrowings: borrowings::BorrowingsService,
    pub activity: activity::ActivityService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        auth_config: AuthConfig,
        borrowing_config: BorrowingConfig,
    ) -> Self {
        Self {
            auth: auth::AuthService::new(repository.clone(), auth_config),
            users: users::UsersService::new(repository.clone()),
            catalog: catalog::CatalogService::new(repository.clone()),
            borrowings: borrowings::BorrowingsService::new(repository.clone(), borrowing_config),
            activity: activity::ActivityService::new(repository.clone()),
            repository,
        }
    }

    /// Database connectivity check for the readiness probe
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}
