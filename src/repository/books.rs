//! Books repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::book::Book,
};

/// Resource lookup used by the lending core.
///
/// Availability is only written by the borrow request transitions, inside
/// the same atomic unit as the request status change.
#[async_trait]
pub trait BooksRepository: Send + Sync {
    /// Get book by ID
    async fn get_by_id(&self, id: Uuid) -> AppResult<Book>;

    /// Whole catalog with current availability, by title
    async fn list(&self) -> AppResult<Vec<Book>>;
}

#[derive(Clone)]
pub struct PgBooksRepository {
    pool: Pool<Postgres>,
}

impl PgBooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BooksRepository for PgBooksRepository {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT id, title, available FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn list(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            "SELECT id, title, available FROM books ORDER BY title, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }
}
