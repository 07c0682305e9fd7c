//! Activity log model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

text_enum! {
    /// Command recorded in the activity log
    ActivityAction {
        Login => "login",
        Register => "register",
        UpdateProfile => "update_profile",
        CreateUser => "create_user",
        UpdateUser => "update_user",
        DeleteUser => "delete_user",
        CreateCategory => "create_category",
        UpdateCategory => "update_category",
        DeleteCategory => "delete_category",
        CreateBook => "create_book",
        UpdateBook => "update_book",
        DeleteBook => "delete_book",
        CreateRequest => "create_request",
        ApproveRequest => "approve_request",
        RejectRequest => "reject_request",
        ReturnBook => "return_book",
        ExtendBook => "extend_book",
    }
}

/// Activity log entry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ActivityLog {
    pub id: i64,
    pub user_id: Option<i32>,
    pub username: Option<String>,
    pub action: ActivityAction,
    pub entity: String,
    pub entity_id: Option<i32>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Entry to append inside a unit of work
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: i32,
    pub action: ActivityAction,
    pub entity: &'static str,
    pub entity_id: Option<i32>,
    pub description: String,
}

impl NewActivity {
    pub fn new(
        user_id: i32,
        action: ActivityAction,
        entity: &'static str,
        entity_id: i32,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            action,
            entity,
            entity_id: Some(entity_id),
            description: description.into(),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ActivityLogQuery {
    pub user_id: Option<i32>,
    pub action: Option<ActivityAction>,
    pub entity: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
