//! Bookmarks repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{book::Book, bookmark::Bookmark},
};

#[async_trait]
pub trait BookmarksRepository: Send + Sync {
    /// Save a bookmark; `BadRequest` if the pair is already bookmarked
    async fn add(&self, bookmark: &Bookmark) -> AppResult<()>;

    /// Drop a bookmark. Returns whether one existed.
    async fn remove(&self, user_id: Uuid, book_id: Uuid) -> AppResult<bool>;

    /// Bookmarked books of a patron, oldest bookmark first
    async fn list_books(&self, user_id: Uuid) -> AppResult<Vec<Book>>;
}

#[derive(Clone)]
pub struct PgBookmarksRepository {
    pool: Pool<Postgres>,
}

impl PgBookmarksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookmarksRepository for PgBookmarksRepository {
    async fn add(&self, bookmark: &Bookmark) -> AppResult<()> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO bookmarks (user_id, book_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, book_id) DO NOTHING
            "#,
        )
        .bind(bookmark.user_id)
        .bind(bookmark.book_id)
        .bind(bookmark.created_at)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(AppError::BadRequest("Book already bookmarked".to_string()));
        }

        Ok(())
    }

    async fn remove(&self, user_id: Uuid, book_id: Uuid) -> AppResult<bool> {
        let deleted = sqlx::query("DELETE FROM bookmarks WHERE user_id = $1 AND book_id = $2")
            .bind(user_id)
            .bind(book_id)
            .execute(&self.pool)
            .await?;

        Ok(deleted.rows_affected() > 0)
    }

    async fn list_books(&self, user_id: Uuid) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT b.id, b.title, b.available
            FROM bookmarks m
            JOIN books b ON b.id = m.book_id
            WHERE m.user_id = $1
            ORDER BY m.seq
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }
}
