//! Bookmark model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// A book a patron saved for later. One per (patron, book) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Bookmark {
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    pub fn new(user_id: Uuid, book_id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            book_id,
            created_at,
        }
    }
}
