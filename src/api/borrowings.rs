//! Borrowing request endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::borrowing::{BorrowingRequest, BorrowingRequestQuery, CreateBorrowingRequest},
    AppState,
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List borrowing requests
///
/// Super users see every request; normal users only their own.
#[utoipa::path(
    get,
    path = "/borrowing-requests",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(BorrowingRequestQuery),
    responses(
        (status = 200, description = "List of borrowing requests", body = PaginatedResponse<BorrowingRequest>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_requests(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowingRequestQuery>,
) -> AppResult<Json<PaginatedResponse<BorrowingRequest>>> {
    let (page, per_page) = (query.page, query.per_page);

    let (requests, total) = state
        .services
        .borrowings
        .search_requests(&claims, query)
        .await?;

    Ok(Json(PaginatedResponse::new(requests, total, page, per_page)))
}

#[utoipa::path(
    get,
    path = "/borrowing-requests/{id}",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing request ID")
    ),
    responses(
        (status = 200, description = "Borrowing request with details", body = BorrowingRequest),
        (status = 403, description = "Not the requester"),
        (status = 404, description = "Borrowing request not found")
    )
)]
pub async fn get_request(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowingRequest>> {
    let request = state.services.borrowings.get_request(&claims, id).await?;
    Ok(Json(request))
}

/// File a borrowing request for one or more books
#[utoipa::path(
    post,
    path = "/borrowing-requests",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowingRequest,
    responses(
        (status = 201, description = "Request created", body = BorrowingRequest),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Book not found"),
        (status = 422, description = "Borrowing rule violated")
    )
)]
pub async fn create_request(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBorrowingRequest>,
) -> AppResult<(StatusCode, Json<BorrowingRequest>)> {
    request.validate()?;

    let created = state
        .services
        .borrowings
        .create_request(&claims, request)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Approve a waiting request and lend out its books
#[utoipa::path(
    post,
    path = "/borrowing-requests/{id}/approve",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing request ID")
    ),
    responses(
        (status = 200, description = "Request approved", body = BorrowingRequest),
        (status = 403, description = "Super user privileges required"),
        (status = 404, description = "Borrowing request not found"),
        (status = 422, description = "Request not waiting or a book is unavailable")
    )
)]
pub async fn approve_request(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowingRequest>> {
    claims.require_super_user()?;

    let request = state.services.borrowings.approve_request(&claims, id).await?;
    Ok(Json(request))
}

#[utoipa::path(
    post,
    path = "/borrowing-requests/{id}/reject",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing request ID")
    ),
    responses(
        (status = 200, description = "Request rejected", body = BorrowingRequest),
        (status = 403, description = "Super user privileges required"),
        (status = 404, description = "Borrowing request not found"),
        (status = 422, description = "Request not waiting")
    )
)]
pub async fn reject_request(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowingRequest>> {
    claims.require_super_user()?;

    let request = state.services.borrowings.reject_request(&claims, id).await?;
    Ok(Json(request))
}

/// Return one borrowed book
#[utoipa::path(
    post,
    path = "/borrowing-requests/{id}/details/{detail_id}/return",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing request ID"),
        ("detail_id" = i32, Path, description = "Borrowing detail ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = BorrowingRequest),
        (status = 403, description = "Not the requester"),
        (status = 404, description = "Request or detail not found"),
        (status = 422, description = "Request not approved or book already returned")
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, detail_id)): Path<(i32, i32)>,
) -> AppResult<Json<BorrowingRequest>> {
    let request = state
        .services
        .borrowings
        .return_book(&claims, id, detail_id)
        .await?;
    Ok(Json(request))
}

/// Extend the due date of one borrowed book
#[utoipa::path(
    post,
    path = "/borrowing-requests/{id}/details/{detail_id}/extend",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing request ID"),
        ("detail_id" = i32, Path, description = "Borrowing detail ID")
    ),
    responses(
        (status = 200, description = "Due date extended", body = BorrowingRequest),
        (status = 403, description = "Not the requester"),
        (status = 404, description = "Request or detail not found"),
        (status = 422, description = "Already extended, returned or overdue")
    )
)]
pub async fn extend_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((id, detail_id)): Path<(i32, i32)>,
) -> AppResult<Json<BorrowingRequest>> {
    let request = state
        .services
        .borrowings
        .extend_book(&claims, id, detail_id)
        .await?;
    Ok(Json(request))
}
