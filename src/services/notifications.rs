//! Notification dispatcher and ledger

use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{NotificationRecord, OutgoingNotification},
    repository::NotificationLogRepository,
    services::{clock::Clock, email::Notifier},
};

/// Sends notifications and records every successful delivery.
///
/// A record is appended only after the notifier reports success, so a
/// failed send leaves no trace in the ledger.
#[derive(Clone)]
pub struct NotificationService {
    notifier: Arc<dyn Notifier>,
    ledger: Arc<dyn NotificationLogRepository>,
    clock: Arc<dyn Clock>,
}

impl NotificationService {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        ledger: Arc<dyn NotificationLogRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            notifier,
            ledger,
            clock,
        }
    }

    /// Attempt delivery and record it on success.
    ///
    /// Failures are logged here; the returned error is for in-core callers
    /// that keep counts and must never be propagated to lifecycle callers.
    pub async fn dispatch(&self, notification: OutgoingNotification) -> AppResult<NotificationRecord> {
        if let Err(e) = self
            .notifier
            .send(&notification.recipient, &notification.subject, &notification.body)
            .await
        {
            tracing::warn!(
                recipient = %notification.recipient,
                subject = %notification.subject,
                "Failed to send notification: {}",
                e
            );
            return Err(e);
        }

        let record = notification.into_record(self.clock.now());
        if let Err(e) = self.ledger.append(&record).await {
            tracing::error!(
                recipient = %record.recipient,
                subject = %record.subject,
                "Notification sent but not recorded: {}",
                e
            );
            return Err(e);
        }

        tracing::debug!(recipient = %record.recipient, subject = %record.subject, "Notification sent");
        Ok(record)
    }

    /// Ledger records sent at or after `since`
    pub async fn sent_since(
        &self,
        since: chrono::DateTime<chrono::Utc>,
    ) -> AppResult<Vec<NotificationRecord>> {
        self.ledger.list_since(since).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::repository::MemoryStore;
    use crate::services::clock::ManualClock;
    use crate::services::email::MockNotifier;
    use chrono::{Duration, Utc};
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_records_after_successful_send() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .with(eq("ada@example.org"), eq("Hello"), eq("Body"))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let service = NotificationService::new(
            Arc::new(notifier),
            Arc::new(store.clone()),
            Arc::new(ManualClock::new(now)),
        );

        let record = service
            .dispatch(OutgoingNotification::new("ada@example.org", "Hello", "Body"))
            .await
            .unwrap();
        assert_eq!(record.sent_at, now);

        let ledger = store.list_since(now - Duration::minutes(1)).await.unwrap();
        assert_eq!(ledger, vec![record]);
    }

    #[tokio::test]
    async fn test_failed_send_leaves_no_record() {
        let store = MemoryStore::new();
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .times(1)
            .returning(|_, _, _| Err(AppError::Transport("connection refused".into())));

        let service = NotificationService::new(
            Arc::new(notifier),
            Arc::new(store.clone()),
            Arc::new(ManualClock::new(Utc::now())),
        );

        let err = service
            .dispatch(OutgoingNotification::new("ada@example.org", "Hello", "Body"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));

        let ledger = store.list_since(Utc::now() - Duration::days(1)).await.unwrap();
        assert!(ledger.is_empty());
    }
}
