//! Catalog listing and patron bookmarks

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Book, Bookmark},
    repository::Repository,
    services::clock::Clock,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl CatalogService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Every book with its current availability
    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list().await
    }

    /// Bookmark a book for a patron. Bookmarking twice is a `BadRequest`.
    pub async fn add_bookmark(&self, user_id: Uuid, book_id: Uuid) -> AppResult<Bookmark> {
        self.repository.patrons.get_by_id(user_id).await?;
        self.repository.books.get_by_id(book_id).await?;

        let bookmark = Bookmark::new(user_id, book_id, self.clock.now());
        self.repository.bookmarks.add(&bookmark).await?;

        tracing::info!(%user_id, %book_id, "Book bookmarked");
        Ok(bookmark)
    }

    /// Remove a bookmark; removing one that does not exist succeeds
    pub async fn remove_bookmark(&self, user_id: Uuid, book_id: Uuid) -> AppResult<()> {
        self.repository.patrons.get_by_id(user_id).await?;

        if self.repository.bookmarks.remove(user_id, book_id).await? {
            tracing::info!(%user_id, %book_id, "Bookmark removed");
        }
        Ok(())
    }

    pub async fn list_bookmarks(&self, user_id: Uuid) -> AppResult<Vec<Book>> {
        self.repository.patrons.get_by_id(user_id).await?;
        self.repository.bookmarks.list_books(user_id).await
    }
}
