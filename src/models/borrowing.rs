//! Borrowing requests and their per-book details
//!
//! A request moves `waiting -> approved | rejected` once. Each detail of an
//! approved request moves `borrowing -> extended -> returned` or
//! `borrowing -> returned`. The helpers here hold those rules; the service
//! layer applies them inside a transaction.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    config::BorrowingConfig,
    error::{AppError, AppResult},
};

text_enum! {
    /// Status of a borrowing request
    RequestStatus {
        Waiting => "waiting",
        Approved => "approved",
        Rejected => "rejected",
    }
}

text_enum! {
    /// Status of one borrowed book inside a request
    DetailStatus {
        Borrowing => "borrowing",
        Returned => "returned",
        Extended => "extended",
    }
}

/// Borrowing request with its details
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowingRequest {
    pub id: i32,
    pub requester_id: i32,
    pub requester_username: String,
    pub requested_at: DateTime<Utc>,
    pub status: RequestStatus,
    pub processor_id: Option<i32>,
    pub processor_username: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    #[sqlx(skip)]
    pub details: Vec<BorrowingDetail>,
}

/// One book of a borrowing request
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowingDetail {
    pub id: i32,
    pub request_id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub status: DetailStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub extended_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    #[sqlx(skip)]
    pub is_overdue: bool,
}

impl BorrowingDetail {
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        self.status != DetailStatus::Returned && self.due_date.map(|d| d < now).unwrap_or(false)
    }
}

/// Borrowing request query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BorrowingRequestQuery {
    pub status: Option<RequestStatus>,
    /// Filter by requester (super users only)
    pub requester_id: Option<i32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create borrowing request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBorrowingRequest {
    #[validate(length(min = 1, message = "At least one book is required"))]
    pub book_ids: Vec<i32>,
}

/// Deduplicate requested book ids, keeping the first occurrence order.
pub fn normalize_book_ids(book_ids: &[i32], max_books: usize) -> AppResult<Vec<i32>> {
    let mut unique = Vec::with_capacity(book_ids.len());
    for id in book_ids {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }

    if unique.is_empty() {
        return Err(AppError::Validation("At least one book is required".to_string()));
    }
    if unique.len() > max_books {
        return Err(AppError::BusinessRule(format!(
            "A request may contain at most {} books ({} requested)",
            max_books,
            unique.len()
        )));
    }
    Ok(unique)
}

/// First instant of the calendar month containing `now` (UTC)
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

pub fn ensure_monthly_quota(requests_this_month: i64, config: &BorrowingConfig) -> AppResult<()> {
    if requests_this_month >= config.max_requests_per_month {
        return Err(AppError::BusinessRule(format!(
            "Monthly limit of {} borrowing requests reached",
            config.max_requests_per_month
        )));
    }
    Ok(())
}

impl RequestStatus {
    /// Approve and reject only apply to waiting requests
    pub fn ensure_waiting(&self) -> AppResult<()> {
        match self {
            RequestStatus::Waiting => Ok(()),
            other => Err(AppError::BusinessRule(format!(
                "Request has already been {}",
                other
            ))),
        }
    }

    /// Return and extend only apply to approved requests
    pub fn ensure_approved(&self) -> AppResult<()> {
        match self {
            RequestStatus::Approved => Ok(()),
            other => Err(AppError::BusinessRule(format!(
                "Request is {}, not approved",
                other
            ))),
        }
    }
}

pub fn due_date_from(approved_at: DateTime<Utc>, config: &BorrowingConfig) -> DateTime<Utc> {
    approved_at + Duration::days(config.borrowing_days)
}

pub fn ensure_returnable(status: DetailStatus) -> AppResult<()> {
    match status {
        DetailStatus::Borrowing | DetailStatus::Extended => Ok(()),
        DetailStatus::Returned => {
            Err(AppError::BusinessRule("Book has already been returned".to_string()))
        }
    }
}

/// New due date for a one-time extension of a borrowed book
pub fn extended_due_date(
    detail: &BorrowingDetail,
    now: DateTime<Utc>,
    config: &BorrowingConfig,
) -> AppResult<DateTime<Utc>> {
    match detail.status {
        DetailStatus::Borrowing => {}
        DetailStatus::Extended => {
            return Err(AppError::BusinessRule(
                "Book has already been extended".to_string(),
            ))
        }
        DetailStatus::Returned => {
            return Err(AppError::BusinessRule(
                "Book has already been returned".to_string(),
            ))
        }
    }

    let due_date = detail
        .due_date
        .ok_or_else(|| AppError::Internal(format!("Detail {} has no due date", detail.id)))?;

    if due_date < now {
        return Err(AppError::BusinessRule(
            "Overdue books cannot be extended".to_string(),
        ));
    }

    Ok(due_date + Duration::days(config.extension_days))
}
