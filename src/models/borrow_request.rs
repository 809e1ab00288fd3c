//! Borrow request model and its lifecycle state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::book::BookShort;
use super::patron::PatronShort;
use crate::error::{AppError, AppResult};

/// Borrow request status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "borrow_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BorrowStatus {
    Pending,
    Approved,
    Rejected,
    Returned,
}

impl BorrowStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, BorrowStatus::Rejected | BorrowStatus::Returned)
    }

    /// Allowed edges: pending -> approved | rejected, approved -> returned
    pub fn can_transition_to(self, next: BorrowStatus) -> bool {
        matches!(
            (self, next),
            (BorrowStatus::Pending, BorrowStatus::Approved)
                | (BorrowStatus::Pending, BorrowStatus::Rejected)
                | (BorrowStatus::Approved, BorrowStatus::Returned)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BorrowStatus::Pending => "pending",
            BorrowStatus::Approved => "approved",
            BorrowStatus::Rejected => "rejected",
            BorrowStatus::Returned => "returned",
        }
    }
}

impl std::fmt::Display for BorrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Borrow request row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub status: BorrowStatus,
    /// Provisional due date computed when the request was submitted
    pub requested_due_date: DateTime<Utc>,
    /// Effective due date, set on approval
    pub due_date: Option<DateTime<Utc>>,
    pub returned: bool,
    pub returned_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl BorrowRequest {
    pub fn new(
        user_id: Uuid,
        book_id: Uuid,
        created_at: DateTime<Utc>,
        requested_due_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            book_id,
            status: BorrowStatus::Pending,
            requested_due_date,
            due_date: None,
            returned: false,
            returned_date: None,
            created_at,
        }
    }

    fn check_transition(&self, next: BorrowStatus) -> AppResult<()> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(AppError::InvalidTransition(format!(
                "Borrow request {} is {} and cannot become {}",
                self.id, self.status, next
            )))
        }
    }

    /// pending -> approved, overwriting the provisional due date
    pub fn approve(&mut self, due_date: DateTime<Utc>) -> AppResult<()> {
        self.check_transition(BorrowStatus::Approved)?;
        self.status = BorrowStatus::Approved;
        self.due_date = Some(due_date);
        Ok(())
    }

    /// pending -> rejected
    pub fn reject(&mut self) -> AppResult<()> {
        self.check_transition(BorrowStatus::Rejected)?;
        self.status = BorrowStatus::Rejected;
        Ok(())
    }

    /// approved -> returned
    pub fn mark_returned(&mut self, returned_at: DateTime<Utc>) -> AppResult<()> {
        self.check_transition(BorrowStatus::Returned)?;
        self.status = BorrowStatus::Returned;
        self.returned = true;
        self.returned_date = Some(returned_at);
        Ok(())
    }

    /// Approved, not returned, and past its due date
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.returned
            && self.status == BorrowStatus::Approved
            && self.due_date.is_some_and(|due| due < now)
    }

    /// Approved and not yet returned
    pub fn is_active_loan(&self) -> bool {
        self.status == BorrowStatus::Approved && !self.returned
    }
}

/// Borrow request joined with its patron and book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BorrowRequestDetails {
    pub id: Uuid,
    pub status: BorrowStatus,
    pub requested_due_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub returned: bool,
    pub returned_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub user: PatronShort,
    pub book: BookShort,
}

impl BorrowRequestDetails {
    pub fn new(request: &BorrowRequest, user: PatronShort, book: BookShort) -> Self {
        Self {
            id: request.id,
            status: request.status,
            requested_due_date: request.requested_due_date,
            due_date: request.due_date,
            returned: request.returned,
            returned_date: request.returned_date,
            created_at: request.created_at,
            user,
            book,
        }
    }
}

/// Result of an approved return
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnOutcome {
    pub request: BorrowRequest,
    /// Patron's completed loan count after this return
    pub books_read: i64,
}
