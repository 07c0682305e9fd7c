//! Borrowing request service
//!
//! Commands (create, approve, reject, return, extend) each run in one unit of
//! work and record an activity row. Queries read straight from the pool.

use chrono::Utc;

use crate::{
    config::BorrowingConfig,
    error::{AppError, AppResult},
    models::{
        borrowing::{
            due_date_from, ensure_monthly_quota, ensure_returnable, extended_due_date,
            month_start, normalize_book_ids, BorrowingRequest, BorrowingRequestQuery,
            CreateBorrowingRequest, RequestStatus,
        },
        ActivityAction, NewActivity, UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct BorrowingsService {
    repository: Repository,
    config: BorrowingConfig,
}

impl BorrowingsService {
    pub fn new(repository: Repository, config: BorrowingConfig) -> Self {
        Self { repository, config }
    }

    /// List requests; normal users only ever see their own
    pub async fn search_requests(
        &self,
        actor: &UserClaims,
        mut query: BorrowingRequestQuery,
    ) -> AppResult<(Vec<BorrowingRequest>, i64)> {
        if !actor.is_super_user() {
            query.requester_id = Some(actor.user_id);
        }
        self.repository.borrowings.search(&query).await
    }

    pub async fn get_request(&self, actor: &UserClaims, id: i32) -> AppResult<BorrowingRequest> {
        let request = self.repository.borrowings.get_by_id(id).await?;
        actor.require_owner_or_super_user(request.requester_id)?;
        Ok(request)
    }

    /// File a new waiting request for the current user
    pub async fn create_request(
        &self,
        actor: &UserClaims,
        request: CreateBorrowingRequest,
    ) -> AppResult<BorrowingRequest> {
        let book_ids = normalize_book_ids(&request.book_ids, self.config.max_books_per_request)?;
        let now = Utc::now();

        let mut uow = self.repository.begin().await?;
        let borrowings = &self.repository.borrowings;

        borrowings.lock_requester(uow.conn(), actor.user_id).await?;

        let this_month = borrowings
            .count_requests_since(uow.conn(), actor.user_id, month_start(now))
            .await?;
        ensure_monthly_quota(this_month, &self.config)?;

        let books = self.repository.books.get_many(uow.conn(), &book_ids).await?;
        if let Some(missing) = book_ids.iter().find(|id| !books.iter().any(|b| b.id == **id)) {
            return Err(AppError::NotFound(format!("Book with id {} not found", missing)));
        }
        if let Some(book) = books.iter().find(|b| b.available <= 0) {
            return Err(AppError::BusinessRule(format!(
                "Book '{}' has no available copy",
                book.title
            )));
        }

        let held = borrowings
            .held_book_ids(uow.conn(), actor.user_id, &book_ids)
            .await?;
        if !held.is_empty() {
            return Err(AppError::BusinessRule(format!(
                "You already borrowed or requested book(s) {:?}",
                held
            )));
        }

        let id = borrowings.create(uow.conn(), actor.user_id, &book_ids).await?;
        uow.log(NewActivity::new(
            actor.user_id,
            ActivityAction::CreateRequest,
            "borrowing_request",
            id,
            format!("Requested {} book(s)", book_ids.len()),
        ))
        .await?;
        uow.commit().await?;

        tracing::info!(request_id = id, user_id = actor.user_id, "Borrowing request created");
        self.repository.borrowings.get_by_id(id).await
    }

    /// Approve a waiting request, taking one copy of each book off the shelf
    pub async fn approve_request(&self, actor: &UserClaims, id: i32) -> AppResult<BorrowingRequest> {
        let now = Utc::now();

        let mut uow = self.repository.begin().await?;
        let borrowings = &self.repository.borrowings;

        let locked = borrowings.lock_request(uow.conn(), id).await?;
        locked.status.ensure_waiting()?;

        let book_ids = borrowings.request_book_ids(uow.conn(), id).await?;
        for book_id in &book_ids {
            if !self.repository.books.take_copy(uow.conn(), *book_id).await? {
                let book = self.repository.books.get_by_id(*book_id).await?;
                return Err(AppError::BusinessRule(format!(
                    "Book '{}' has no available copy left",
                    book.title
                )));
            }
        }

        borrowings
            .set_due_dates(uow.conn(), id, due_date_from(now, &self.config))
            .await?;
        borrowings
            .set_status(uow.conn(), id, RequestStatus::Approved, actor.user_id, now)
            .await?;
        uow.log(NewActivity::new(
            actor.user_id,
            ActivityAction::ApproveRequest,
            "borrowing_request",
            id,
            format!("Approved request of user {} ({} book(s))", locked.requester_id, book_ids.len()),
        ))
        .await?;
        uow.commit().await?;

        tracing::info!(request_id = id, approver_id = actor.user_id, "Borrowing request approved");
        self.repository.borrowings.get_by_id(id).await
    }

    /// Reject a waiting request; book counters are untouched
    pub async fn reject_request(&self, actor: &UserClaims, id: i32) -> AppResult<BorrowingRequest> {
        let now = Utc::now();

        let mut uow = self.repository.begin().await?;
        let borrowings = &self.repository.borrowings;

        let locked = borrowings.lock_request(uow.conn(), id).await?;
        locked.status.ensure_waiting()?;

        borrowings
            .set_status(uow.conn(), id, RequestStatus::Rejected, actor.user_id, now)
            .await?;
        uow.log(NewActivity::new(
            actor.user_id,
            ActivityAction::RejectRequest,
            "borrowing_request",
            id,
            format!("Rejected request of user {}", locked.requester_id),
        ))
        .await?;
        uow.commit().await?;

        tracing::info!(request_id = id, approver_id = actor.user_id, "Borrowing request rejected");
        self.repository.borrowings.get_by_id(id).await
    }

    /// Return one book of an approved request
    pub async fn return_book(
        &self,
        actor: &UserClaims,
        request_id: i32,
        detail_id: i32,
    ) -> AppResult<BorrowingRequest> {
        let now = Utc::now();

        let mut uow = self.repository.begin().await?;
        let borrowings = &self.repository.borrowings;

        let locked = borrowings.lock_request(uow.conn(), request_id).await?;
        actor.require_owner_or_super_user(locked.requester_id)?;
        locked.status.ensure_approved()?;

        let detail = borrowings.lock_detail(uow.conn(), request_id, detail_id).await?;
        ensure_returnable(detail.status)?;

        borrowings.mark_returned(uow.conn(), detail_id, now).await?;
        self.repository
            .books
            .put_back_copy(uow.conn(), detail.book_id)
            .await?;
        uow.log(NewActivity::new(
            actor.user_id,
            ActivityAction::ReturnBook,
            "borrowing_request_detail",
            detail_id,
            format!("Returned '{}' (request {})", detail.book_title, request_id),
        ))
        .await?;
        uow.commit().await?;

        self.repository.borrowings.get_by_id(request_id).await
    }

    /// Extend the due date of one borrowed book, once
    pub async fn extend_book(
        &self,
        actor: &UserClaims,
        request_id: i32,
        detail_id: i32,
    ) -> AppResult<BorrowingRequest> {
        let now = Utc::now();

        let mut uow = self.repository.begin().await?;
        let borrowings = &self.repository.borrowings;

        let locked = borrowings.lock_request(uow.conn(), request_id).await?;
        actor.require_owner_or_super_user(locked.requester_id)?;
        locked.status.ensure_approved()?;

        let detail = borrowings.lock_detail(uow.conn(), request_id, detail_id).await?;
        let due_date = extended_due_date(&detail, now, &self.config)?;

        borrowings
            .mark_extended(uow.conn(), detail_id, due_date, now)
            .await?;
        uow.log(NewActivity::new(
            actor.user_id,
            ActivityAction::ExtendBook,
            "borrowing_request_detail",
            detail_id,
            format!(
                "Extended '{}' until {} (request {})",
                detail.book_title,
                due_date.format("%Y-%m-%d"),
                request_id
            ),
        ))
        .await?;
        uow.commit().await?;

        self.repository.borrowings.get_by_id(request_id).await
    }
}
