//! Book (lendable resource) model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Book availability as tracked by the resource ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    /// False while an approved, not yet returned request holds the book
    pub available: bool,
}

impl Book {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            available: true,
        }
    }
}

/// Short book representation embedded in request listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BookShort {
    pub id: Uuid,
    pub title: String,
}

impl BookShort {
    pub const UNKNOWN_TITLE: &'static str = "Unknown book";

    /// Stand-in for a request whose book record is gone
    pub fn unknown(id: Uuid) -> Self {
        Self {
            id,
            title: Self::UNKNOWN_TITLE.to_string(),
        }
    }
}

impl From<&Book> for BookShort {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
        }
    }
}
