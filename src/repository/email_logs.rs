//! Notification ledger storage

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::notification::NotificationRecord};

/// Append-only log of delivered notifications
#[async_trait]
pub trait NotificationLogRepository: Send + Sync {
    async fn append(&self, record: &NotificationRecord) -> AppResult<()>;

    /// Records sent at or after `since`, oldest first
    async fn list_since(&self, since: DateTime<Utc>) -> AppResult<Vec<NotificationRecord>>;
}

#[derive(Clone)]
pub struct PgNotificationLogRepository {
    pool: Pool<Postgres>,
}

impl PgNotificationLogRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationLogRepository for PgNotificationLogRepository {
    async fn append(&self, record: &NotificationRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO email_logs (id, recipient, subject, body, sent_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.id)
        .bind(&record.recipient)
        .bind(&record.subject)
        .bind(&record.body)
        .bind(record.sent_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_since(&self, since: DateTime<Utc>) -> AppResult<Vec<NotificationRecord>> {
        let records = sqlx::query_as::<_, NotificationRecord>(
            r#"
            SELECT id, recipient, subject, body, sent_at
            FROM email_logs
            WHERE sent_at >= $1
            ORDER BY seq
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
