//! Borrow request endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{BorrowRequestDetails, BorrowStatus, PatronStats},
};

/// Borrow request body
#[derive(Deserialize, ToSchema)]
pub struct BorrowRequestBody {
    /// Requesting patron
    pub user_id: Uuid,
}

/// Borrow request state after a transition
#[derive(Serialize, ToSchema)]
pub struct BorrowResponse {
    pub id: Uuid,
    pub status: BorrowStatus,
    /// Effective due date once approved, provisional one while pending
    pub due_date: DateTime<Utc>,
    pub message: String,
}

/// Return approval response
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    pub message: String,
    /// Patron's completed loans after this return
    pub books_read: i64,
}

/// Submit a borrow request for a book
#[utoipa::path(
    post,
    path = "/books/{book_id}/borrow",
    tag = "loans",
    params(
        ("book_id" = Uuid, Path, description = "Book ID")
    ),
    request_body = BorrowRequestBody,
    responses(
        (status = 201, description = "Borrow request submitted", body = BorrowResponse),
        (status = 404, description = "User not found"),
        (status = 409, description = "Book is not available")
    )
)]
pub async fn submit_request(
    State(state): State<crate::AppState>,
    Path(book_id): Path<Uuid>,
    Json(body): Json<BorrowRequestBody>,
) -> AppResult<(StatusCode, Json<BorrowResponse>)> {
    let request = state.services.loans.submit_request(body.user_id, book_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(BorrowResponse {
            id: request.id,
            status: request.status,
            due_date: request.requested_due_date,
            message: "Borrow request submitted successfully".to_string(),
        }),
    ))
}

/// List pending borrow requests
#[utoipa::path(
    get,
    path = "/borrow-requests",
    tag = "loans",
    responses(
        (status = 200, description = "Pending requests", body = Vec<BorrowRequestDetails>)
    )
)]
pub async fn list_pending(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<BorrowRequestDetails>>> {
    Ok(Json(state.services.loans.list_pending().await?))
}

/// Approve a pending borrow request
#[utoipa::path(
    post,
    path = "/borrow-requests/{id}/approve",
    tag = "loans",
    params(
        ("id" = Uuid, Path, description = "Borrow request ID")
    ),
    responses(
        (status = 200, description = "Request approved", body = BorrowResponse),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request not pending or book already on loan")
    )
)]
pub async fn approve(
    State(state): State<crate::AppState>,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<BorrowResponse>> {
    let request = state.services.loans.approve(request_id).await?;

    Ok(Json(BorrowResponse {
        id: request.id,
        status: request.status,
        due_date: request.due_date.unwrap_or(request.requested_due_date),
        message: "Borrow request approved".to_string(),
    }))
}

/// Reject a pending borrow request
#[utoipa::path(
    post,
    path = "/borrow-requests/{id}/reject",
    tag = "loans",
    params(
        ("id" = Uuid, Path, description = "Borrow request ID")
    ),
    responses(
        (status = 200, description = "Request rejected", body = BorrowResponse),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request not pending")
    )
)]
pub async fn reject(
    State(state): State<crate::AppState>,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<BorrowResponse>> {
    let request = state.services.loans.reject(request_id).await?;

    Ok(Json(BorrowResponse {
        id: request.id,
        status: request.status,
        due_date: request.requested_due_date,
        message: "Borrow request rejected".to_string(),
    }))
}

/// Approve the return of a borrowed book
#[utoipa::path(
    post,
    path = "/borrow-requests/{id}/return",
    tag = "loans",
    params(
        ("id" = Uuid, Path, description = "Borrow request ID")
    ),
    responses(
        (status = 200, description = "Return approved", body = ReturnResponse),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request is not an active loan")
    )
)]
pub async fn approve_return(
    State(state): State<crate::AppState>,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<ReturnResponse>> {
    let outcome = state.services.loans.approve_return(request_id).await?;

    Ok(Json(ReturnResponse {
        message: "Return approved, book marked as available".to_string(),
        books_read: outcome.books_read,
    }))
}

/// Overdue loans of a user
#[utoipa::path(
    get,
    path = "/users/{id}/overdue",
    tag = "loans",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Overdue loans", body = Vec<BorrowRequestDetails>)
    )
)]
pub async fn list_overdue(
    State(state): State<crate::AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<BorrowRequestDetails>>> {
    Ok(Json(state.services.loans.list_overdue_for_user(user_id).await?))
}

/// Active loans of a user
#[utoipa::path(
    get,
    path = "/users/{id}/borrowed",
    tag = "loans",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Approved, unreturned loans", body = Vec<BorrowRequestDetails>)
    )
)]
pub async fn list_borrowed(
    State(state): State<crate::AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<BorrowRequestDetails>>> {
    Ok(Json(state.services.loans.list_active_for_user(user_id).await?))
}

/// Reading statistics of a user
#[utoipa::path(
    get,
    path = "/users/{id}/stats",
    tag = "loans",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User statistics", body = PatronStats),
        (status = 404, description = "User not found")
    )
)]
pub async fn user_stats(
    State(state): State<crate::AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<PatronStats>> {
    Ok(Json(state.services.loans.user_stats(user_id).await?))
}
