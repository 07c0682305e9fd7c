//! Activity logs repository

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        activity_log::{ActivityLog, ActivityLogQuery, NewActivity},
        Page,
    },
};

#[derive(Clone)]
pub struct ActivityLogsRepository {
    pool: Pool<Postgres>,
}

impl ActivityLogsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert an activity row on the given connection
    pub async fn insert(conn: &mut PgConnection, activity: &NewActivity) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO activity_logs (user_id, action, entity, entity_id, description)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(activity.user_id)
        .bind(activity.action)
        .bind(activity.entity)
        .bind(activity.entity_id)
        .bind(&activity.description)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Search activity logs, newest first
    pub async fn search(&self, query: &ActivityLogQuery) -> AppResult<(Vec<ActivityLog>, i64)> {
        let page = Page::new(query.page, query.per_page);

        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.user_id.is_some() {
            conditions.push(format!("a.user_id = ${}", idx));
            idx += 1;
        }
        if query.action.is_some() {
            conditions.push(format!("a.action = ${}", idx));
            idx += 1;
        }
        if query.entity.is_some() {
            conditions.push(format!("a.entity = ${}", idx));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!("SELECT COUNT(*) FROM activity_logs a {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        if let Some(user_id) = query.user_id {
            count_builder = count_builder.bind(user_id);
        }
        if let Some(action) = query.action {
            count_builder = count_builder.bind(action);
        }
        if let Some(ref entity) = query.entity {
            count_builder = count_builder.bind(entity);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            r#"
            SELECT a.id, a.user_id, u.username, a.action, a.entity, a.entity_id,
                   a.description, a.created_at
            FROM activity_logs a
            LEFT JOIN users u ON u.id = a.user_id
            {}
            ORDER BY a.created_at DESC, a.id DESC
            LIMIT {} OFFSET {}
            "#,
            where_clause,
            page.per_page,
            page.offset()
        );

        let mut builder = sqlx::query_as::<_, ActivityLog>(&select_query);
        if let Some(user_id) = query.user_id {
            builder = builder.bind(user_id);
        }
        if let Some(action) = query.action {
            builder = builder.bind(action);
        }
        if let Some(ref entity) = query.entity {
            builder = builder.bind(entity);
        }
        let logs = builder.fetch_all(&self.pool).await?;

        Ok((logs, total))
    }
}
