//! Activity log endpoint (super users)

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::activity_log::{ActivityLog, ActivityLogQuery},
    AppState,
};

use super::{AuthenticatedUser, PaginatedResponse};

/// Browse the activity log, newest first
#[utoipa::path(
    get,
    path = "/activity-logs",
    tag = "activity",
    security(("bearer_auth" = [])),
    params(ActivityLogQuery),
    responses(
        (status = 200, description = "Activity log entries", body = PaginatedResponse<ActivityLog>),
        (status = 403, description = "Super user privileges required")
    )
)]
pub async fn list_activity_logs(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ActivityLogQuery>,
) -> AppResult<Json<PaginatedResponse<ActivityLog>>> {
    claims.require_super_user()?;

    let (entries, total) = state.services.activity.search(&query).await?;

    Ok(Json(PaginatedResponse::new(entries, total, query.page, query.per_page)))
}
