//! Borrow requests repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Pool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::BookShort,
        borrow_request::{BorrowRequest, BorrowRequestDetails, BorrowStatus, ReturnOutcome},
        patron::PatronShort,
    },
};

/// Lifecycle store. Every transition that touches book availability is a
/// single atomic unit: the request status check, the availability claim and
/// the writes commit together or not at all.
#[async_trait]
pub trait BorrowRequestsRepository: Send + Sync {
    /// Get borrow request by ID
    async fn get_by_id(&self, id: Uuid) -> AppResult<BorrowRequest>;

    /// Persist a freshly submitted request. The book must still be
    /// available when the insert commits, otherwise `ResourceUnavailable`.
    async fn create(&self, request: &BorrowRequest) -> AppResult<()>;

    /// pending -> approved; claims the book (available -> on loan)
    async fn approve(&self, id: Uuid, due_date: DateTime<Utc>) -> AppResult<BorrowRequest>;

    /// pending -> rejected; no availability change
    async fn reject(&self, id: Uuid) -> AppResult<BorrowRequest>;

    /// approved -> returned; releases the book and bumps the patron's counter
    async fn complete_return(&self, id: Uuid, returned_at: DateTime<Utc>) -> AppResult<ReturnOutcome>;

    /// Requests awaiting staff decision, oldest first
    async fn list_pending(&self) -> AppResult<Vec<BorrowRequestDetails>>;

    /// Unreturned requests due before `now`, optionally for a single patron
    async fn list_overdue(
        &self,
        now: DateTime<Utc>,
        user_id: Option<Uuid>,
    ) -> AppResult<Vec<BorrowRequestDetails>>;

    /// Approved, unreturned requests of a patron
    async fn list_active(&self, user_id: Uuid) -> AppResult<Vec<BorrowRequestDetails>>;
}

#[derive(Clone)]
pub struct PgBorrowRequestsRepository {
    pool: Pool<Postgres>,
}

impl PgBorrowRequestsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn lock_request(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, BorrowRequest>("SELECT * FROM borrow_requests WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow request with id {} not found", id)))
    }

    /// A missing patron or book resolves to a placeholder, never drops the row
    async fn list_details(
        &self,
        filter: &str,
        now: Option<DateTime<Utc>>,
        user_id: Option<Uuid>,
    ) -> AppResult<Vec<BorrowRequestDetails>> {
        let sql = format!(
            r#"
            SELECT r.id, r.status, r.requested_due_date, r.due_date, r.returned,
                   r.returned_date, r.created_at,
                   r.user_id, COALESCE(u.name, $3) as user_name, u.email as user_email,
                   r.book_id, COALESCE(b.title, $4) as book_title
            FROM borrow_requests r
            LEFT JOIN users u ON u.id = r.user_id
            LEFT JOIN books b ON b.id = r.book_id
            WHERE {filter}
              AND ($1::timestamptz IS NULL OR r.due_date < $1)
              AND ($2::uuid IS NULL OR r.user_id = $2)
            ORDER BY r.seq
            "#
        );

        let rows = sqlx::query_as::<_, BorrowRequestDetailsRow>(&sql)
            .bind(now)
            .bind(user_id)
            .bind(PatronShort::UNKNOWN_NAME)
            .bind(BookShort::UNKNOWN_TITLE)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl BorrowRequestsRepository for PgBorrowRequestsRepository {
    async fn get_by_id(&self, id: Uuid) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, BorrowRequest>("SELECT * FROM borrow_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow request with id {} not found", id)))
    }

    async fn create(&self, request: &BorrowRequest) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        // Shared lock: waits for an in-flight approval of the same book
        let available: Option<bool> =
            sqlx::query_scalar("SELECT available FROM books WHERE id = $1 FOR SHARE")
                .bind(request.book_id)
                .fetch_optional(&mut *tx)
                .await?;
        if available != Some(true) {
            return Err(AppError::ResourceUnavailable(format!(
                "Book {} is not available",
                request.book_id
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO borrow_requests
                (id, user_id, book_id, status, requested_due_date, due_date, returned, returned_date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(request.id)
        .bind(request.user_id)
        .bind(request.book_id)
        .bind(request.status)
        .bind(request.requested_due_date)
        .bind(request.due_date)
        .bind(request.returned)
        .bind(request.returned_date)
        .bind(request.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn approve(&self, id: Uuid, due_date: DateTime<Utc>) -> AppResult<BorrowRequest> {
        let mut tx = self.pool.begin().await?;

        let mut request = Self::lock_request(&mut tx, id).await?;
        request.approve(due_date)?;

        // Claim the book; concurrent approvals serialize on this row lock
        let available: Option<bool> =
            sqlx::query_scalar("SELECT available FROM books WHERE id = $1 FOR UPDATE")
                .bind(request.book_id)
                .fetch_optional(&mut *tx)
                .await?;

        match available {
            Some(true) => {}
            Some(false) => {
                return Err(AppError::ResourceUnavailable(format!(
                    "Book {} is already on loan",
                    request.book_id
                )))
            }
            None => {
                return Err(AppError::ResourceUnavailable(format!(
                    "Book {} no longer exists",
                    request.book_id
                )))
            }
        }

        sqlx::query("UPDATE books SET available = FALSE WHERE id = $1")
            .bind(request.book_id)
            .execute(&mut *tx)
            .await?;

        let request = sqlx::query_as::<_, BorrowRequest>(
            "UPDATE borrow_requests SET status = $2, due_date = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(request.status)
        .bind(request.due_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(request)
    }

    async fn reject(&self, id: Uuid) -> AppResult<BorrowRequest> {
        let mut tx = self.pool.begin().await?;

        let mut request = Self::lock_request(&mut tx, id).await?;
        request.reject()?;

        let request = sqlx::query_as::<_, BorrowRequest>(
            "UPDATE borrow_requests SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(request.status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(request)
    }

    async fn complete_return(&self, id: Uuid, returned_at: DateTime<Utc>) -> AppResult<ReturnOutcome> {
        let mut tx = self.pool.begin().await?;

        let mut request = Self::lock_request(&mut tx, id).await?;
        request.mark_returned(returned_at)?;

        let request = sqlx::query_as::<_, BorrowRequest>(
            r#"
            UPDATE borrow_requests
            SET status = $2, returned = TRUE, returned_date = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.status)
        .bind(request.returned_date)
        .fetch_one(&mut *tx)
        .await?;

        let released = sqlx::query("UPDATE books SET available = TRUE WHERE id = $1")
            .bind(request.book_id)
            .execute(&mut *tx)
            .await?;
        if released.rows_affected() == 0 {
            tracing::warn!("Book {} not found while returning request {}", request.book_id, id);
        }

        let books_read: i64 = sqlx::query_scalar(
            "UPDATE users SET books_read = books_read + 1 WHERE id = $1 RETURNING books_read",
        )
        .bind(request.user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", request.user_id)))?;

        tx.commit().await?;

        Ok(ReturnOutcome { request, books_read })
    }

    async fn list_pending(&self) -> AppResult<Vec<BorrowRequestDetails>> {
        self.list_details("r.status = 'pending'", None, None).await
    }

    async fn list_overdue(
        &self,
        now: DateTime<Utc>,
        user_id: Option<Uuid>,
    ) -> AppResult<Vec<BorrowRequestDetails>> {
        self.list_details(
            "r.status = 'approved' AND r.returned = FALSE AND r.due_date IS NOT NULL",
            Some(now),
            user_id,
        )
        .await
    }

    async fn list_active(&self, user_id: Uuid) -> AppResult<Vec<BorrowRequestDetails>> {
        self.list_details(
            "r.status = 'approved' AND r.returned = FALSE",
            None,
            Some(user_id),
        )
        .await
    }
}

/// Flat row of the request/user/book join
#[derive(FromRow)]
struct BorrowRequestDetailsRow {
    id: Uuid,
    status: BorrowStatus,
    requested_due_date: DateTime<Utc>,
    due_date: Option<DateTime<Utc>>,
    returned: bool,
    returned_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    user_id: Uuid,
    user_name: String,
    user_email: Option<String>,
    book_id: Uuid,
    book_title: String,
}

impl From<BorrowRequestDetailsRow> for BorrowRequestDetails {
    fn from(row: BorrowRequestDetailsRow) -> Self {
        Self {
            id: row.id,
            status: row.status,
            requested_due_date: row.requested_due_date,
            due_date: row.due_date,
            returned: row.returned,
            returned_date: row.returned_date,
            created_at: row.created_at,
            user: PatronShort {
                id: row.user_id,
                name: row.user_name,
                email: row.user_email,
            },
            book: BookShort {
                id: row.book_id,
                title: row.book_title,
            },
        }
    }
}
