//! Patron (registered reader) model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Patron as seen by the lending core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Patron {
    pub id: Uuid,
    pub name: String,
    /// Contact address; patrons without one are skipped by the overdue sweep
    pub email: Option<String>,
    /// Completed loans, incremented once per approved return
    #[serde(default)]
    pub books_read: i64,
}

impl Patron {
    pub fn new(name: impl Into<String>, email: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email,
            books_read: 0,
        }
    }

    /// Email address if one is set and non-blank
    pub fn contact_email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}

/// Short patron representation embedded in request listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PatronShort {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
}

impl PatronShort {
    pub const UNKNOWN_NAME: &'static str = "Unknown patron";

    /// Stand-in for a request whose patron record is gone
    pub fn unknown(id: Uuid) -> Self {
        Self {
            id,
            name: Self::UNKNOWN_NAME.to_string(),
            email: None,
        }
    }
}

impl From<&Patron> for PatronShort {
    fn from(patron: &Patron) -> Self {
        Self {
            id: patron.id,
            name: patron.name.clone(),
            email: patron.email.clone(),
        }
    }
}

/// Reading statistics for a patron
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PatronStats {
    pub books_read: i64,
}
