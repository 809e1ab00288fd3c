//! Repository layer for persistence

pub mod bookmarks;
pub mod books;
pub mod borrow_requests;
pub mod email_logs;
pub mod health;
pub mod memory;
pub mod patrons;

use sqlx::{Pool, Postgres};
use std::sync::Arc;

pub use bookmarks::BookmarksRepository;
pub use books::BooksRepository;
pub use borrow_requests::BorrowRequestsRepository;
pub use email_logs::NotificationLogRepository;
pub use health::StoreHealth;
pub use memory::{MemoryStore, SeedFixture};
pub use patrons::PatronsRepository;

/// Main repository struct bundling every store the services use
#[derive(Clone)]
pub struct Repository {
    pub patrons: Arc<dyn PatronsRepository>,
    pub books: Arc<dyn BooksRepository>,
    pub requests: Arc<dyn BorrowRequestsRepository>,
    pub email_logs: Arc<dyn NotificationLogRepository>,
    pub bookmarks: Arc<dyn BookmarksRepository>,
    pub health: Arc<dyn StoreHealth>,
}

impl Repository {
    /// Create a repository backed by the given PostgreSQL pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            patrons: Arc::new(patrons::PgPatronsRepository::new(pool.clone())),
            books: Arc::new(books::PgBooksRepository::new(pool.clone())),
            requests: Arc::new(borrow_requests::PgBorrowRequestsRepository::new(pool.clone())),
            email_logs: Arc::new(email_logs::PgNotificationLogRepository::new(pool.clone())),
            bookmarks: Arc::new(bookmarks::PgBookmarksRepository::new(pool.clone())),
            health: Arc::new(health::PgStoreHealth::new(pool)),
        }
    }

    /// Create a repository where every store is the given in-memory store
    pub fn in_memory(store: MemoryStore) -> Self {
        Self {
            patrons: Arc::new(store.clone()),
            books: Arc::new(store.clone()),
            requests: Arc::new(store.clone()),
            email_logs: Arc::new(store.clone()),
            bookmarks: Arc::new(store.clone()),
            health: Arc::new(store),
        }
    }
}
