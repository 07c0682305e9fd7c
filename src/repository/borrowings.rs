//! Borrowing requests repository

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        borrowing::{BorrowingDetail, BorrowingRequest, BorrowingRequestQuery, DetailStatus, RequestStatus},
        Page,
    },
};

const REQUEST_SELECT: &str = r#"
    SELECT r.id, r.requester_id, u.username AS requester_username, r.requested_at,
           r.status, r.processor_id, p.username AS processor_username, r.processed_at
    FROM borrowing_requests r
    JOIN users u ON u.id = r.requester_id
    LEFT JOIN users p ON p.id = r.processor_id
"#;

const DETAIL_SELECT: &str = r#"
    SELECT d.id, d.request_id, d.book_id, b.title AS book_title, d.status,
           d.due_date, d.extended_at, d.returned_at
    FROM borrowing_request_details d
    JOIN books b ON b.id = d.book_id
"#;

/// Request header locked for the current transaction
#[derive(Debug, Clone, FromRow)]
pub struct LockedRequest {
    pub id: i32,
    pub requester_id: i32,
    pub status: RequestStatus,
}

#[derive(Clone)]
pub struct BorrowingsRepository {
    pool: Pool<Postgres>,
}

impl BorrowingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get a request with its details
    pub async fn get_by_id(&self, id: i32) -> AppResult<BorrowingRequest> {
        let mut request = sqlx::query_as::<_, BorrowingRequest>(&format!(
            "{} WHERE r.id = $1",
            REQUEST_SELECT
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrowing request with id {} not found", id)))?;

        request.details = self.load_details(&[id]).await?;
        Ok(request)
    }

    /// Search requests, newest first, with details attached
    pub async fn search(
        &self,
        query: &BorrowingRequestQuery,
    ) -> AppResult<(Vec<BorrowingRequest>, i64)> {
        let page = Page::new(query.page, query.per_page);

        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.status.is_some() {
            conditions.push(format!("r.status = ${}", idx));
            idx += 1;
        }
        if query.requester_id.is_some() {
            conditions.push(format!("r.requester_id = ${}", idx));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!("SELECT COUNT(*) FROM borrowing_requests r {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        if let Some(status) = query.status {
            count_builder = count_builder.bind(status);
        }
        if let Some(requester_id) = query.requester_id {
            count_builder = count_builder.bind(requester_id);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            "{} {} ORDER BY r.requested_at DESC, r.id DESC LIMIT {} OFFSET {}",
            REQUEST_SELECT,
            where_clause,
            page.per_page,
            page.offset()
        );
        let mut builder = sqlx::query_as::<_, BorrowingRequest>(&select_query);
        if let Some(status) = query.status {
            builder = builder.bind(status);
        }
        if let Some(requester_id) = query.requester_id {
            builder = builder.bind(requester_id);
        }
        let mut requests = builder.fetch_all(&self.pool).await?;

        let ids: Vec<i32> = requests.iter().map(|r| r.id).collect();
        let mut details = self.load_details(&ids).await?;
        for request in &mut requests {
            let (own, rest): (Vec<_>, Vec<_>) =
                details.into_iter().partition(|d| d.request_id == request.id);
            request.details = own;
            details = rest;
        }

        Ok((requests, total))
    }

    async fn load_details(&self, request_ids: &[i32]) -> AppResult<Vec<BorrowingDetail>> {
        if request_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut details = sqlx::query_as::<_, BorrowingDetail>(&format!(
            "{} WHERE d.request_id = ANY($1) ORDER BY d.request_id, d.id",
            DETAIL_SELECT
        ))
        .bind(request_ids)
        .fetch_all(&self.pool)
        .await?;

        let now = Utc::now();
        for detail in &mut details {
            detail.is_overdue = detail.is_overdue_at(now);
        }
        Ok(details)
    }

    /// Serialize concurrent request creation for one requester
    pub async fn lock_requester(&self, conn: &mut PgConnection, requester_id: i32) -> AppResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(requester_id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", requester_id)))?;
        Ok(())
    }

    /// Non-rejected requests filed by a user since the given instant
    pub async fn count_requests_since(
        &self,
        conn: &mut PgConnection,
        requester_id: i32,
        since: DateTime<Utc>,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM borrowing_requests
            WHERE requester_id = $1 AND requested_at >= $2 AND status != 'rejected'
            "#,
        )
        .bind(requester_id)
        .bind(since)
        .fetch_one(conn)
        .await?;
        Ok(count)
    }

    /// Subset of `book_ids` the user already holds or is waiting for
    pub async fn held_book_ids(
        &self,
        conn: &mut PgConnection,
        requester_id: i32,
        book_ids: &[i32],
    ) -> AppResult<Vec<i32>> {
        let held = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT DISTINCT d.book_id
            FROM borrowing_request_details d
            JOIN borrowing_requests r ON r.id = d.request_id
            WHERE r.requester_id = $1
              AND d.book_id = ANY($2)
              AND (r.status = 'waiting'
                   OR (r.status = 'approved' AND d.status != 'returned'))
            ORDER BY d.book_id
            "#,
        )
        .bind(requester_id)
        .bind(book_ids)
        .fetch_all(conn)
        .await?;
        Ok(held)
    }

    /// Insert a waiting request with one detail per book
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        requester_id: i32,
        book_ids: &[i32],
    ) -> AppResult<i32> {
        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO borrowing_requests (requester_id, status) VALUES ($1, $2) RETURNING id",
        )
        .bind(requester_id)
        .bind(RequestStatus::Waiting)
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO borrowing_request_details (request_id, book_id, status)
            SELECT $1, book_id, $3 FROM UNNEST($2::INTEGER[]) AS t(book_id)
            "#,
        )
        .bind(id)
        .bind(book_ids)
        .bind(DetailStatus::Borrowing)
        .execute(conn)
        .await?;

        Ok(id)
    }

    /// Lock a request header for the current transaction
    pub async fn lock_request(&self, conn: &mut PgConnection, id: i32) -> AppResult<LockedRequest> {
        sqlx::query_as::<_, LockedRequest>(
            "SELECT id, requester_id, status FROM borrowing_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrowing request with id {} not found", id)))
    }

    /// Book ids of a request, in detail order
    pub async fn request_book_ids(&self, conn: &mut PgConnection, request_id: i32) -> AppResult<Vec<i32>> {
        let ids = sqlx::query_scalar::<_, i32>(
            "SELECT book_id FROM borrowing_request_details WHERE request_id = $1 ORDER BY book_id",
        )
        .bind(request_id)
        .fetch_all(conn)
        .await?;
        Ok(ids)
    }

    /// Close a waiting request as approved or rejected
    pub async fn set_status(
        &self,
        conn: &mut PgConnection,
        id: i32,
        status: RequestStatus,
        processor_id: i32,
        processed_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE borrowing_requests SET status = $2, processor_id = $3, processed_at = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(processor_id)
        .bind(processed_at)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn set_due_dates(
        &self,
        conn: &mut PgConnection,
        request_id: i32,
        due_date: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query("UPDATE borrowing_request_details SET due_date = $2 WHERE request_id = $1")
            .bind(request_id)
            .bind(due_date)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Lock one detail of a request for the current transaction
    pub async fn lock_detail(
        &self,
        conn: &mut PgConnection,
        request_id: i32,
        detail_id: i32,
    ) -> AppResult<BorrowingDetail> {
        sqlx::query_as::<_, BorrowingDetail>(&format!(
            "{} WHERE d.id = $1 AND d.request_id = $2 FOR UPDATE OF d",
            DETAIL_SELECT
        ))
        .bind(detail_id)
        .bind(request_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Detail {} not found in borrowing request {}",
                detail_id, request_id
            ))
        })
    }

    pub async fn mark_returned(
        &self,
        conn: &mut PgConnection,
        detail_id: i32,
        returned_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query("UPDATE borrowing_request_details SET status = $2, returned_at = $3 WHERE id = $1")
            .bind(detail_id)
            .bind(DetailStatus::Returned)
            .bind(returned_at)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn mark_extended(
        &self,
        conn: &mut PgConnection,
        detail_id: i32,
        due_date: DateTime<Utc>,
        extended_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE borrowing_request_details SET status = $2, due_date = $3, extended_at = $4 WHERE id = $1",
        )
        .bind(detail_id)
        .bind(DetailStatus::Extended)
        .bind(due_date)
        .bind(extended_at)
        .execute(conn)
        .await?;
        Ok(())
    }
}
