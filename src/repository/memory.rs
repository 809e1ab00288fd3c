//! In-memory store for development and tests.
//!
//! All collections live behind one lock, so each compound transition is
//! trivially atomic with respect to every other store operation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    bookmarks::BookmarksRepository, books::BooksRepository,
    borrow_requests::BorrowRequestsRepository, email_logs::NotificationLogRepository,
    health::StoreHealth, patrons::PatronsRepository,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        Book, BookShort, Bookmark, BorrowRequest, BorrowRequestDetails, NotificationRecord,
        Patron, PatronShort, ReturnOutcome,
    },
};

/// Patrons and books a memory store starts with
#[derive(Debug, Default, Deserialize)]
pub struct SeedFixture {
    #[serde(default)]
    pub patrons: Vec<Patron>,
    #[serde(default)]
    pub books: Vec<Book>,
}

#[derive(Debug, Default)]
struct MemoryState {
    patrons: HashMap<Uuid, Patron>,
    books: HashMap<Uuid, Book>,
    /// Insertion order is the listing order
    requests: Vec<BorrowRequest>,
    email_logs: Vec<NotificationRecord>,
    bookmarks: Vec<Bookmark>,
}

impl MemoryState {
    fn request_mut(&mut self, id: Uuid) -> AppResult<&mut BorrowRequest> {
        self.requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Borrow request with id {} not found", id)))
    }

    fn details(&self, request: &BorrowRequest) -> BorrowRequestDetails {
        let patron = self
            .patrons
            .get(&request.user_id)
            .map(PatronShort::from)
            .unwrap_or_else(|| PatronShort::unknown(request.user_id));
        let book = self
            .books
            .get(&request.book_id)
            .map(BookShort::from)
            .unwrap_or_else(|| BookShort::unknown(request.book_id));
        BorrowRequestDetails::new(request, patron, book)
    }

    fn list_where<F>(&self, predicate: F) -> Vec<BorrowRequestDetails>
    where
        F: Fn(&BorrowRequest) -> bool,
    {
        self.requests
            .iter()
            .filter(|r| predicate(r))
            .map(|r| self.details(r))
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: SeedFixture) -> Self {
        let state = MemoryState {
            patrons: fixture.patrons.into_iter().map(|p| (p.id, p)).collect(),
            books: fixture.books.into_iter().map(|b| (b.id, b)).collect(),
            ..MemoryState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Load a JSON seed fixture
    pub fn from_seed_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Internal(format!("Cannot read seed file {}: {}", path.display(), e))
        })?;
        let fixture: SeedFixture = serde_json::from_str(&raw).map_err(|e| {
            AppError::Internal(format!("Invalid seed file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            patrons = fixture.patrons.len(),
            books = fixture.books.len(),
            "Memory store seeded from {}",
            path.display()
        );

        Ok(Self::from_fixture(fixture))
    }

    pub async fn insert_patron(&self, patron: Patron) {
        self.state.lock().await.patrons.insert(patron.id, patron);
    }

    pub async fn insert_book(&self, book: Book) {
        self.state.lock().await.books.insert(book.id, book);
    }

    #[cfg(test)]
    pub(crate) async fn remove_book(&self, id: Uuid) -> Option<Book> {
        self.state.lock().await.books.remove(&id)
    }

    /// Snapshot of every stored request, in submission order
    pub async fn requests(&self) -> Vec<BorrowRequest> {
        self.state.lock().await.requests.clone()
    }
}

#[async_trait]
impl PatronsRepository for MemoryStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Patron> {
        self.state
            .lock()
            .await
            .patrons
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }
}

#[async_trait]
impl BooksRepository for MemoryStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Book> {
        self.state
            .lock()
            .await
            .books
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    async fn list(&self) -> AppResult<Vec<Book>> {
        let state = self.state.lock().await;
        let mut books: Vec<Book> = state.books.values().cloned().collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(books)
    }
}

#[async_trait]
impl BorrowRequestsRepository for MemoryStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<BorrowRequest> {
        let mut state = self.state.lock().await;
        state.request_mut(id).map(|r| r.clone())
    }

    async fn create(&self, request: &BorrowRequest) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.requests.iter().any(|r| r.id == request.id) {
            return Err(AppError::Persistence(format!(
                "Borrow request {} already exists",
                request.id
            )));
        }
        if !state.books.get(&request.book_id).is_some_and(|b| b.available) {
            return Err(AppError::ResourceUnavailable(format!(
                "Book {} is not available",
                request.book_id
            )));
        }
        state.requests.push(request.clone());
        Ok(())
    }

    async fn approve(&self, id: Uuid, due_date: DateTime<Utc>) -> AppResult<BorrowRequest> {
        let mut state = self.state.lock().await;

        let mut request = state.request_mut(id)?.clone();
        request.approve(due_date)?;

        let book = state.books.get_mut(&request.book_id).ok_or_else(|| {
            AppError::ResourceUnavailable(format!("Book {} no longer exists", request.book_id))
        })?;
        if !book.available {
            return Err(AppError::ResourceUnavailable(format!(
                "Book {} is already on loan",
                request.book_id
            )));
        }
        book.available = false;

        *state.request_mut(id)? = request.clone();
        Ok(request)
    }

    async fn reject(&self, id: Uuid) -> AppResult<BorrowRequest> {
        let mut state = self.state.lock().await;
        let request = state.request_mut(id)?;
        request.reject()?;
        Ok(request.clone())
    }

    async fn complete_return(&self, id: Uuid, returned_at: DateTime<Utc>) -> AppResult<ReturnOutcome> {
        let mut state = self.state.lock().await;

        let mut request = state.request_mut(id)?.clone();
        request.mark_returned(returned_at)?;

        let patron = state.patrons.get_mut(&request.user_id).ok_or_else(|| {
            AppError::NotFound(format!("User with id {} not found", request.user_id))
        })?;
        patron.books_read += 1;
        let books_read = patron.books_read;

        match state.books.get_mut(&request.book_id) {
            Some(book) => book.available = true,
            None => tracing::warn!("Book {} not found while returning request {}", request.book_id, id),
        }

        *state.request_mut(id)? = request.clone();
        Ok(ReturnOutcome { request, books_read })
    }

    async fn list_pending(&self) -> AppResult<Vec<BorrowRequestDetails>> {
        let state = self.state.lock().await;
        Ok(state.list_where(|r| r.status == crate::models::BorrowStatus::Pending))
    }

    async fn list_overdue(
        &self,
        now: DateTime<Utc>,
        user_id: Option<Uuid>,
    ) -> AppResult<Vec<BorrowRequestDetails>> {
        let state = self.state.lock().await;
        Ok(state.list_where(|r| r.is_overdue(now) && user_id.map_or(true, |u| r.user_id == u)))
    }

    async fn list_active(&self, user_id: Uuid) -> AppResult<Vec<BorrowRequestDetails>> {
        let state = self.state.lock().await;
        Ok(state.list_where(|r| r.is_active_loan() && r.user_id == user_id))
    }
}

#[async_trait]
impl NotificationLogRepository for MemoryStore {
    async fn append(&self, record: &NotificationRecord) -> AppResult<()> {
        self.state.lock().await.email_logs.push(record.clone());
        Ok(())
    }

    async fn list_since(&self, since: DateTime<Utc>) -> AppResult<Vec<NotificationRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .email_logs
            .iter()
            .filter(|r| r.sent_at >= since)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BookmarksRepository for MemoryStore {
    async fn add(&self, bookmark: &Bookmark) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state
            .bookmarks
            .iter()
            .any(|m| m.user_id == bookmark.user_id && m.book_id == bookmark.book_id)
        {
            return Err(AppError::BadRequest("Book already bookmarked".to_string()));
        }
        state.bookmarks.push(bookmark.clone());
        Ok(())
    }

    async fn remove(&self, user_id: Uuid, book_id: Uuid) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let before = state.bookmarks.len();
        state
            .bookmarks
            .retain(|m| !(m.user_id == user_id && m.book_id == book_id));
        Ok(state.bookmarks.len() < before)
    }

    async fn list_books(&self, user_id: Uuid) -> AppResult<Vec<Book>> {
        let state = self.state.lock().await;
        Ok(state
            .bookmarks
            .iter()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| state.books.get(&m.book_id).cloned())
            .collect())
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
