//! Categories repository

use chrono::Utc;
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        category::{Category, CategoryQuery, CreateCategory, UpdateCategory},
        like_pattern, Page,
    },
};

const CATEGORY_SELECT: &str = r#"
    SELECT c.id, c.name, c.description,
           (SELECT COUNT(*) FROM books b WHERE b.category_id = c.id) AS book_count,
           c.created_at, c.updated_at
    FROM categories c
"#;

#[derive(Clone)]
pub struct CategoriesRepository {
    pool: Pool<Postgres>,
}

impl CategoriesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Category> {
        sqlx::query_as::<_, Category>(&format!("{} WHERE c.id = $1", CATEGORY_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category with id {} not found", id)))
    }

    pub async fn exists(&self, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Check if a category name is already taken (case-insensitive)
    pub async fn name_exists(&self, name: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM categories
                WHERE LOWER(name) = LOWER($1) AND ($2::INTEGER IS NULL OR id != $2)
            )
            "#,
        )
        .bind(name)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn search(&self, query: &CategoryQuery) -> AppResult<(Vec<Category>, i64)> {
        let page = Page::new(query.page, query.per_page);
        let name = query.name.as_deref().map(like_pattern);

        let where_clause = if name.is_some() {
            "WHERE LOWER(c.name) LIKE $1"
        } else {
            ""
        };

        let count_query = format!("SELECT COUNT(*) FROM categories c {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        if let Some(ref name) = name {
            count_builder = count_builder.bind(name);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            "{} {} ORDER BY c.name LIMIT {} OFFSET {}",
            CATEGORY_SELECT,
            where_clause,
            page.per_page,
            page.offset()
        );
        let mut builder = sqlx::query_as::<_, Category>(&select_query);
        if let Some(ref name) = name {
            builder = builder.bind(name);
        }
        let categories = builder.fetch_all(&self.pool).await?;

        Ok((categories, total))
    }

    pub async fn create(&self, conn: &mut PgConnection, category: &CreateCategory) -> AppResult<i32> {
        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO categories (name, description) VALUES ($1, $2) RETURNING id",
        )
        .bind(category.name.trim())
        .bind(&category.description)
        .fetch_one(conn)
        .await?;
        Ok(id)
    }

    pub async fn update(
        &self,
        conn: &mut PgConnection,
        id: i32,
        category: &UpdateCategory,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE categories SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(category.name.as_deref().map(str::trim))
        .bind(&category.description)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Category with id {} not found", id)));
        }
        Ok(())
    }

    /// Delete a category; fails while books are still filed under it
    pub async fn delete(&self, conn: &mut PgConnection, id: i32) -> AppResult<String> {
        let books: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE category_id = $1")
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;

        if books > 0 {
            return Err(AppError::Conflict(format!(
                "Category still contains {} book(s)",
                books
            )));
        }

        sqlx::query_scalar::<_, String>("DELETE FROM categories WHERE id = $1 RETURNING name")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category with id {} not found", id)))
    }
}
