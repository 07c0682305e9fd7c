//! Activity log queries

use crate::{
    error::AppResult,
    models::activity_log::{ActivityLog, ActivityLogQuery},
    repository::Repository,
};

#[derive(Clone)]
pub struct ActivityService {
    repository: Repository,
}

impl ActivityService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn search(&self, query: &ActivityLogQuery) -> AppResult<(Vec<ActivityLog>, i64)> {
        self.repository.activity_logs.search(query).await
    }
}
