//! Borrow lifecycle management

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        BorrowRequest, BorrowRequestDetails, OutgoingNotification, PatronStats, ReturnOutcome,
    },
    repository::Repository,
    services::{
        clock::Clock,
        due_date::{compute_due_date, LoanPolicy},
        notifications::NotificationService,
    },
};

/// Format used for due dates in notification bodies ("Fri Mar 15 2024")
const DATE_FORMAT: &str = "%a %b %d %Y";

/// Owns the borrow request state machine and is the only writer of book
/// availability.
#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    notifications: NotificationService,
    clock: Arc<dyn Clock>,
}

impl LoansService {
    pub fn new(repository: Repository, notifications: NotificationService, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            notifications,
            clock,
        }
    }

    /// Submit a borrow request. The book stays available until approval.
    pub async fn submit_request(&self, user_id: Uuid, book_id: Uuid) -> AppResult<BorrowRequest> {
        let book = match self.repository.books.get_by_id(book_id).await {
            Ok(book) if book.available => book,
            Ok(_) | Err(AppError::NotFound(_)) => {
                return Err(AppError::ResourceUnavailable(format!(
                    "Book {} is not available",
                    book_id
                )))
            }
            Err(e) => return Err(e),
        };

        // Verify user exists
        self.repository.patrons.get_by_id(user_id).await?;

        let now = self.clock.now();
        let request = BorrowRequest::new(
            user_id,
            book.id,
            now,
            compute_due_date(now, LoanPolicy::StandardLoan),
        );
        self.repository.requests.create(&request).await?;

        tracing::info!(request_id = %request.id, %user_id, %book_id, "Borrow request submitted");
        Ok(request)
    }

    /// Approve a pending request and put the book on loan
    pub async fn approve(&self, request_id: Uuid) -> AppResult<BorrowRequest> {
        let due_date = compute_due_date(self.clock.now(), LoanPolicy::ApprovedLoan);
        let request = self.repository.requests.approve(request_id, due_date).await?;

        tracing::info!(%request_id, book_id = %request.book_id, %due_date, "Borrow request approved");

        self.notify_patron(&request, |name, title| {
            (
                "Borrow Request Approved".to_string(),
                format!(
                    "Dear {},\n\nYour borrow request for \"{}\" has been approved. Your due date is {}.",
                    name,
                    title,
                    format_due_date(due_date)
                ),
            )
        })
        .await;

        Ok(request)
    }

    /// Reject a pending request. The book is untouched.
    pub async fn reject(&self, request_id: Uuid) -> AppResult<BorrowRequest> {
        let request = self.repository.requests.reject(request_id).await?;
        tracing::info!(%request_id, "Borrow request rejected");
        Ok(request)
    }

    /// Accept the return of an approved loan
    pub async fn approve_return(&self, request_id: Uuid) -> AppResult<ReturnOutcome> {
        let outcome = self
            .repository
            .requests
            .complete_return(request_id, self.clock.now())
            .await?;

        tracing::info!(
            %request_id,
            user_id = %outcome.request.user_id,
            books_read = outcome.books_read,
            "Return approved"
        );

        self.notify_patron(&outcome.request, |name, title| {
            (
                "Book Returned Successfully".to_string(),
                format!(
                    "Dear {},\n\nYou have successfully returned \"{}\". Thank you!\n\n- Library Team",
                    name, title
                ),
            )
        })
        .await;

        Ok(outcome)
    }

    /// Requests awaiting a decision
    pub async fn list_pending(&self) -> AppResult<Vec<BorrowRequestDetails>> {
        self.repository.requests.list_pending().await
    }

    /// Overdue loans of one patron
    pub async fn list_overdue_for_user(&self, user_id: Uuid) -> AppResult<Vec<BorrowRequestDetails>> {
        self.repository
            .requests
            .list_overdue(self.clock.now(), Some(user_id))
            .await
    }

    /// Approved, unreturned loans of one patron
    pub async fn list_active_for_user(&self, user_id: Uuid) -> AppResult<Vec<BorrowRequestDetails>> {
        self.repository.requests.list_active(user_id).await
    }

    pub async fn user_stats(&self, user_id: Uuid) -> AppResult<PatronStats> {
        let patron = self.repository.patrons.get_by_id(user_id).await?;
        Ok(PatronStats {
            books_read: patron.books_read,
        })
    }

    /// Confirmation messages are best-effort: any failure is logged and
    /// the committed transition stands.
    async fn notify_patron<F>(&self, request: &BorrowRequest, compose: F)
    where
        F: FnOnce(&str, &str) -> (String, String),
    {
        let patron = match self.repository.patrons.get_by_id(request.user_id).await {
            Ok(patron) => patron,
            Err(e) => {
                tracing::warn!(request_id = %request.id, "Cannot load patron for notification: {}", e);
                return;
            }
        };
        let Some(email) = patron.contact_email() else {
            tracing::warn!(user_id = %patron.id, "Patron has no email, skipping notification");
            return;
        };
        let title = match self.repository.books.get_by_id(request.book_id).await {
            Ok(book) => book.title,
            Err(e) => {
                tracing::warn!(request_id = %request.id, "Cannot load book for notification: {}", e);
                return;
            }
        };

        let (subject, body) = compose(&patron.name, &title);
        // Outcome already logged by the dispatcher
        let _ = self
            .notifications
            .dispatch(OutgoingNotification::new(email, subject, body))
            .await;
    }
}

/// Render a due date the way notification bodies do
pub fn format_due_date(due_date: DateTime<Utc>) -> String {
    due_date.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BorrowStatus;
    use crate::repository::{BooksRepository, PatronsRepository};
    use crate::services::test_support::Harness;
    use chrono::Duration;

    #[tokio::test]
    async fn test_submit_keeps_book_available() {
        let h = Harness::new();
        let patron = h.patron("Ada", Some("ada@example.org")).await;
        let book = h.book("Dune").await;

        let request = h.services.loans.submit_request(patron.id, book.id).await.unwrap();
        assert_eq!(request.status, BorrowStatus::Pending);
        assert_eq!(request.requested_due_date, h.clock.now() + Duration::days(15));
        assert!(request.due_date.is_none());
        assert!(BooksRepository::get_by_id(&h.store, book.id).await.unwrap().available);
    }

    #[tokio::test]
    async fn test_submit_rejects_unavailable_or_missing_book() {
        let h = Harness::new();
        let patron = h.patron("Ada", Some("ada@example.org")).await;
        let book = h.book("Dune").await;

        let first = h.services.loans.submit_request(patron.id, book.id).await.unwrap();
        h.services.loans.approve(first.id).await.unwrap();

        let err = h.services.loans.submit_request(patron.id, book.id).await.unwrap_err();
        assert!(matches!(err, AppError::ResourceUnavailable(_)));

        let err = h.services.loans.submit_request(patron.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::ResourceUnavailable(_)));

        assert_eq!(h.store.requests().await.len(), 1);
    }

    #[tokio::test]
    async fn test_submit_unknown_patron() {
        let h = Harness::new();
        let book = h.book("Dune").await;

        let err = h.services.loans.submit_request(Uuid::new_v4(), book.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(h.store.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_approve_sets_due_date_and_notifies() {
        let h = Harness::new();
        let patron = h.patron("Ada", Some("ada@example.org")).await;
        let book = h.book("Dune").await;
        let request = h.services.loans.submit_request(patron.id, book.id).await.unwrap();

        h.clock.advance(Duration::hours(5));
        let approved = h.services.loans.approve(request.id).await.unwrap();

        assert_eq!(approved.status, BorrowStatus::Approved);
        assert_eq!(approved.due_date, Some(h.clock.now() + Duration::days(14)));
        assert!(!BooksRepository::get_by_id(&h.store, book.id).await.unwrap().available);

        let attempts = h.notifier.attempts();
        assert_eq!(attempts.len(), 1);
        let (to, subject, body) = &attempts[0];
        assert_eq!(to, "ada@example.org");
        assert_eq!(subject, "Borrow Request Approved");
        assert!(body.contains("\"Dune\""));
        assert!(body.contains(&format_due_date(h.clock.now() + Duration::days(14))));
    }

    #[tokio::test]
    async fn test_approve_guards() {
        let h = Harness::new();
        let patron = h.patron("Ada", Some("ada@example.org")).await;
        let book = h.book("Dune").await;
        let request = h.services.loans.submit_request(patron.id, book.id).await.unwrap();

        let err = h.services.loans.approve(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        h.services.loans.approve(request.id).await.unwrap();
        let err = h.services.loans.approve(request.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn test_approval_survives_failed_email() {
        let h = Harness::new();
        let patron = h.patron("Ada", Some("ada@example.org")).await;
        let book = h.book("Dune").await;
        h.notifier.fail_for("ada@example.org");

        let request = h.services.loans.submit_request(patron.id, book.id).await.unwrap();
        let approved = h.services.loans.approve(request.id).await.unwrap();
        assert_eq!(approved.status, BorrowStatus::Approved);

        let ledger = h
            .services
            .notifications
            .sent_since(h.clock.now() - Duration::days(1))
            .await
            .unwrap();
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_reject_is_terminal() {
        let h = Harness::new();
        let patron = h.patron("Ada", Some("ada@example.org")).await;
        let book = h.book("Dune").await;
        let request = h.services.loans.submit_request(patron.id, book.id).await.unwrap();

        let rejected = h.services.loans.reject(request.id).await.unwrap();
        assert_eq!(rejected.status, BorrowStatus::Rejected);
        assert!(BooksRepository::get_by_id(&h.store, book.id).await.unwrap().available);

        let err = h.services.loans.approve(request.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn test_return_counts_once() {
        let h = Harness::new();
        let patron = h.patron("Ada", Some("ada@example.org")).await;
        let book = h.book("Dune").await;
        let request = h.services.loans.submit_request(patron.id, book.id).await.unwrap();

        let err = h.services.loans.approve_return(request.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));

        h.services.loans.approve(request.id).await.unwrap();
        h.clock.advance(Duration::days(3));
        let outcome = h.services.loans.approve_return(request.id).await.unwrap();
        assert_eq!(outcome.books_read, 1);
        assert_eq!(outcome.request.status, BorrowStatus::Returned);
        assert!(outcome.request.returned);
        assert_eq!(outcome.request.returned_date, Some(h.clock.now()));
        assert!(BooksRepository::get_by_id(&h.store, book.id).await.unwrap().available);

        let err = h.services.loans.approve_return(request.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
        assert_eq!(PatronsRepository::get_by_id(&h.store, patron.id).await.unwrap().books_read, 1);

        assert_eq!(
            h.notifier.subjects(),
            vec!["Borrow Request Approved", "Book Returned Successfully"]
        );
    }

    #[tokio::test]
    async fn test_activity_counter_after_many_returns() {
        let h = Harness::new();
        let patron = h.patron("Ada", Some("ada@example.org")).await;

        for n in 1..=3 {
            let book = h.book(&format!("Volume {}", n)).await;
            let request = h.services.loans.submit_request(patron.id, book.id).await.unwrap();
            h.services.loans.approve(request.id).await.unwrap();
            h.services.loans.approve_return(request.id).await.unwrap();
        }

        assert_eq!(h.services.loans.user_stats(patron.id).await.unwrap().books_read, 3);
    }

    #[tokio::test]
    async fn test_concurrent_approvals_claim_book_once() {
        let h = Harness::new();
        let book = h.book("Dune").await;
        let mut ids = Vec::new();
        for n in 0..8 {
            let patron = h.patron(&format!("Reader {}", n), None).await;
            ids.push(h.services.loans.submit_request(patron.id, book.id).await.unwrap().id);
        }

        let handles: Vec<_> = ids
            .into_iter()
            .map(|id| {
                let loans = h.services.loans.clone();
                tokio::spawn(async move { loans.approve(id).await })
            })
            .collect();

        let mut approved = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => approved += 1,
                Err(e) => assert!(matches!(e, AppError::ResourceUnavailable(_))),
            }
        }
        assert_eq!(approved, 1);
        assert!(!BooksRepository::get_by_id(&h.store, book.id).await.unwrap().available);
    }

    #[tokio::test]
    async fn test_query_surfaces() {
        let h = Harness::new();
        let ada = h.patron("Ada", Some("ada@example.org")).await;
        let dune = h.book("Dune").await;
        let emma = h.book("Emma").await;

        let loan = h.services.loans.submit_request(ada.id, dune.id).await.unwrap();
        let pending = h.services.loans.submit_request(ada.id, emma.id).await.unwrap();
        h.services.loans.approve(loan.id).await.unwrap();

        let listed = h.services.loans.list_pending().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, pending.id);
        assert_eq!(listed[0].book.title, "Emma");

        let active = h.services.loans.list_active_for_user(ada.id).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, loan.id);

        assert!(h.services.loans.list_overdue_for_user(ada.id).await.unwrap().is_empty());
        h.clock.advance(Duration::days(15));
        let overdue = h.services.loans.list_overdue_for_user(ada.id).await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, loan.id);
    }
}
