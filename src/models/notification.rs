//! Notification ledger records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// One successfully delivered notification. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

/// Notification content before it is sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingNotification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingNotification {
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    pub fn into_record(self, sent_at: DateTime<Utc>) -> NotificationRecord {
        NotificationRecord {
            id: Uuid::new_v4(),
            recipient: self.recipient,
            subject: self.subject,
            body: self.body,
            sent_at,
        }
    }
}

/// Outcome of an overdue sweep invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct OverdueSweepReport {
    /// Overdue requests found
    pub overdue: usize,
    /// Patrons whose notice was handed to the dispatcher, in dispatch order
    pub notified: Vec<String>,
    /// Overdue requests skipped because the patron has no email
    pub skipped: usize,
    /// Patron notices that failed to deliver
    pub failed: usize,
    /// Whether an administrative message was delivered
    pub admin_notified: bool,
}

/// Outcome of a daily summary invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DailySummaryReport {
    /// Ledger records in today's window
    pub records: usize,
    /// Whether the summary was delivered
    pub sent: bool,
}
