//! Users repository for database operations

use chrono::Utc;
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        user::{Role, UpdateProfile, UpdateUser, User, UserQuery},
        like_pattern, Page,
    },
};

const USER_COLUMNS: &str =
    "id, username, password_hash, first_name, last_name, email, role, created_at, updated_at";

/// Fields of a user row to insert
pub struct NewUser<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub role: Role,
}

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by username (case-insensitive)
    pub async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE LOWER(username) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Check if username already exists
    pub async fn username_exists(&self, username: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM users
                WHERE LOWER(username) = LOWER($1) AND ($2::INTEGER IS NULL OR id != $2)
            )
            "#,
        )
        .bind(username)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Books a user still holds: waiting requests plus unreturned approved details
    pub async fn count_open_borrowings(&self, conn: &mut PgConnection, id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM borrowing_request_details d
            JOIN borrowing_requests r ON r.id = d.request_id
            WHERE r.requester_id = $1
              AND (r.status = 'waiting'
                   OR (r.status = 'approved' AND d.status != 'returned'))
            "#,
        )
        .bind(id)
        .fetch_one(conn)
        .await?;
        Ok(count)
    }

    /// Search users with pagination
    pub async fn search(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        let page = Page::new(query.page, query.per_page);

        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.search.is_some() {
            conditions.push(format!(
                "(LOWER(username) LIKE ${0} OR LOWER(first_name) LIKE ${0} OR LOWER(last_name) LIKE ${0})",
                idx
            ));
            idx += 1;
        }
        if query.role.is_some() {
            conditions.push(format!("role = ${}", idx));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let search = query
            .search
            .as_deref()
            .map(like_pattern);

        let count_query = format!("SELECT COUNT(*) FROM users {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        if let Some(ref search) = search {
            count_builder = count_builder.bind(search);
        }
        if let Some(role) = query.role {
            count_builder = count_builder.bind(role);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            "SELECT {} FROM users {} ORDER BY username LIMIT {} OFFSET {}",
            USER_COLUMNS,
            where_clause,
            page.per_page,
            page.offset()
        );
        let mut builder = sqlx::query_as::<_, User>(&select_query);
        if let Some(ref search) = search {
            builder = builder.bind(search);
        }
        if let Some(role) = query.role {
            builder = builder.bind(role);
        }
        let users = builder.fetch_all(&self.pool).await?;

        Ok((users, total))
    }

    /// Create a new user
    pub async fn create(&self, conn: &mut PgConnection, user: &NewUser<'_>) -> AppResult<User> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, password_hash, first_name, last_name, email, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user.username)
        .bind(user.password_hash)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.email)
        .bind(user.role)
        .fetch_one(conn)
        .await?;

        Ok(created)
    }

    /// Update an existing user; absent fields are left untouched
    pub async fn update(
        &self,
        conn: &mut PgConnection,
        id: i32,
        user: &UpdateUser,
        password_hash: Option<String>,
    ) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                username = COALESCE($2, username),
                password_hash = COALESCE($3, password_hash),
                first_name = COALESCE($4, first_name),
                last_name = COALESCE($5, last_name),
                email = COALESCE($6, email),
                role = COALESCE($7, role),
                updated_at = $8
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(id)
        .bind(user.username.as_deref().map(str::trim))
        .bind(password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(user.role)
        .bind(Utc::now())
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Update own profile fields
    pub async fn update_profile(
        &self,
        conn: &mut PgConnection,
        id: i32,
        profile: &UpdateProfile,
        password_hash: Option<String>,
    ) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                password_hash = COALESCE($5, password_hash),
                updated_at = $6
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(id)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.email)
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    pub async fn update_password_hash(
        &self,
        conn: &mut PgConnection,
        id: i32,
        password_hash: &str,
    ) -> AppResult<()> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .bind(Utc::now())
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Delete a user
    pub async fn delete(&self, conn: &mut PgConnection, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }
}
