//! Books repository for database operations

use chrono::Utc;
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery, CreateBook, UpdateBook},
        like_pattern, Page,
    },
};

const BOOK_SELECT: &str = r#"
    SELECT b.id, b.title, b.author, b.description, b.category_id,
           c.name AS category_name, b.quantity, b.available,
           b.created_at, b.updated_at
    FROM books b
    LEFT JOIN categories c ON c.id = b.category_id
"#;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!("{} WHERE b.id = $1", BOOK_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Get a book and lock its row for the rest of the transaction
    pub async fn get_for_update(&self, conn: &mut PgConnection, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!("{} WHERE b.id = $1 FOR UPDATE OF b", BOOK_SELECT))
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Fetch several books inside a transaction, in id order
    pub async fn get_many(&self, conn: &mut PgConnection, ids: &[i32]) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "{} WHERE b.id = ANY($1) ORDER BY b.id",
            BOOK_SELECT
        ))
        .bind(ids)
        .fetch_all(conn)
        .await?;
        Ok(books)
    }

    /// Search books with filters and pagination
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let page = Page::new(query.page, query.per_page);

        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.search.is_some() {
            conditions.push(format!(
                "(LOWER(b.title) LIKE ${0} OR LOWER(b.author) LIKE ${0})",
                idx
            ));
            idx += 1;
        }
        if query.category_id.is_some() {
            conditions.push(format!("b.category_id = ${}", idx));
        }
        if query.available_only.unwrap_or(false) {
            conditions.push("b.available > 0".to_string());
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

        let count_query = format!("SELECT COUNT(*) FROM books b {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        if let Some(ref search) = search {
            count_builder = count_builder.bind(search);
        }
        if let Some(category_id) = query.category_id {
            count_builder = count_builder.bind(category_id);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            "{} {} ORDER BY b.title, b.id LIMIT {} OFFSET {}",
            BOOK_SELECT,
            where_clause,
            page.per_page,
            page.offset()
        );
        let mut builder = sqlx::query_as::<_, Book>(&select_query);
        if let Some(ref search) = search {
            builder = builder.bind(search);
        }
        if let Some(category_id) = query.category_id {
            builder = builder.bind(category_id);
        }
        let books = builder.fetch_all(&self.pool).await?;

        Ok((books, total))
    }

    /// Create a new book with every copy on the shelf
    pub async fn create(&self, conn: &mut PgConnection, book: &CreateBook) -> AppResult<i32> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO books (title, author, description, category_id, quantity, available)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id
            "#,
        )
        .bind(book.title.trim())
        .bind(&book.author)
        .bind(&book.description)
        .bind(book.category_id)
        .bind(book.quantity)
        .fetch_one(conn)
        .await?;
        Ok(id)
    }

    /// Update a book; `quantity`/`available` are already rebalanced by the caller
    pub async fn update(
        &self,
        conn: &mut PgConnection,
        id: i32,
        book: &UpdateBook,
        quantity: i32,
        available: i32,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                author = COALESCE($3, author),
                description = COALESCE($4, description),
                category_id = COALESCE($5, category_id),
                quantity = $6,
                available = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(book.title.as_deref().map(str::trim))
        .bind(&book.author)
        .bind(&book.description)
        .bind(book.category_id)
        .bind(quantity)
        .bind(available)
        .bind(Utc::now())
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Whether the book appears in any request still waiting for approval
    pub async fn in_waiting_request(&self, conn: &mut PgConnection, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM borrowing_request_details d
                JOIN borrowing_requests r ON r.id = d.request_id
                WHERE d.book_id = $1 AND r.status = 'waiting'
            )
            "#,
        )
        .bind(id)
        .fetch_one(conn)
        .await?;
        Ok(exists)
    }

    /// Delete a book and its closed request details (returned or rejected).
    /// Callers must have checked that no open borrowing references it.
    pub async fn delete(&self, conn: &mut PgConnection, id: i32) -> AppResult<()> {
        sqlx::query("DELETE FROM borrowing_request_details WHERE book_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }

    /// Take one copy off the shelf. Returns false when none is available.
    pub async fn take_copy(&self, conn: &mut PgConnection, id: i32) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE books SET available = available - 1, updated_at = $2 WHERE id = $1 AND available > 0",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Put one copy back on the shelf
    pub async fn put_back_copy(&self, conn: &mut PgConnection, id: i32) -> AppResult<()> {
        sqlx::query(
            "UPDATE books SET available = LEAST(available + 1, quantity), updated_at = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(conn)
        .await?;
        Ok(())
    }
}
