//! Daily summary of sent notifications

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{
    error::AppResult,
    models::{DailySummaryReport, NotificationRecord, OutgoingNotification},
    services::{clock::Clock, notifications::NotificationService, scheduler::ScheduledJob},
};

pub const DAILY_SUMMARY_SUBJECT: &str = "LibMaster Daily Summary";

/// Reads today's ledger window and mails one consolidated report to the
/// administrator. Never mutates the ledger except through its own dispatch.
#[derive(Clone)]
pub struct DailySummary {
    notifications: NotificationService,
    clock: Arc<dyn Clock>,
    admin_email: Option<String>,
    /// Held for the whole invocation
    running: Arc<Mutex<()>>,
}

impl DailySummary {
    pub fn new(
        notifications: NotificationService,
        clock: Arc<dyn Clock>,
        admin_email: Option<String>,
    ) -> Self {
        Self {
            notifications,
            clock,
            admin_email,
            running: Arc::new(Mutex::new(())),
        }
    }

    pub async fn run(&self) -> AppResult<DailySummaryReport> {
        let _running = self.running.lock().await;
        let Some(admin) = self.admin_email.as_deref() else {
            tracing::error!("No admin email configured, daily summary not sent");
            return Ok(DailySummaryReport::default());
        };

        let since = start_of_day(self.clock.now());
        let records = self.notifications.sent_since(since).await?;

        let body = if records.is_empty() {
            "No emails were sent today.".to_string()
        } else {
            format!("Email Report:\n\n{}", render_records(&records))
        };

        let sent = self
            .notifications
            .dispatch(OutgoingNotification::new(admin, DAILY_SUMMARY_SUBJECT, body))
            .await
            .is_ok();

        tracing::info!(records = records.len(), sent, "Daily summary completed");

        Ok(DailySummaryReport {
            records: records.len(),
            sent,
        })
    }
}

#[async_trait]
impl ScheduledJob for DailySummary {
    fn name(&self) -> &'static str {
        "daily-summary"
    }

    async fn run_once(&self) -> AppResult<()> {
        self.run().await.map(|_| ())
    }
}

/// Midnight (UTC) of the day containing `now`
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(chrono::NaiveTime::MIN).and_utc()
}

fn render_records(records: &[NotificationRecord]) -> String {
    records
        .iter()
        .map(|entry| {
            format!(
                "Email Sent!\n\
                 ---------------------------------------\n\
                 To: {}\n\
                 Subject: {}\n\
                 Sent On: {}\n\
                 \n\
                 Message:\n\
                 {}\n\
                 ---------------------------------------\n\
                 \n\
                 Status: Successfully Sent!",
                entry.recipient,
                entry.subject,
                entry.sent_at.format("%Y-%m-%d %H:%M:%S UTC"),
                entry.body
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_start_of_day() {
        let now = Utc.with_ymd_and_hms(2024, 5, 4, 21, 0, 0).unwrap();
        assert_eq!(start_of_day(now), Utc.with_ymd_and_hms(2024, 5, 4, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_render_keeps_ledger_order() {
        let at = Utc.with_ymd_and_hms(2024, 5, 4, 8, 0, 0).unwrap();
        let records = vec![
            OutgoingNotification::new("a@x", "s1", "first body").into_record(at),
            OutgoingNotification::new("b@x", "s2", "second body").into_record(at),
        ];

        let rendered = render_records(&records);
        let first = rendered.find("To: a@x").unwrap();
        let second = rendered.find("To: b@x").unwrap();
        assert!(first < second);
        assert!(rendered.contains("Subject: s1"));
        assert!(rendered.contains("Message:\nsecond body"));
        assert!(rendered.contains("Sent On: 2024-05-04 08:00:00 UTC"));
    }
}

#[cfg(test)]
mod service_tests {
    use super::*;
    use crate::services::test_support::{Harness, ADMIN};
    use chrono::Duration;

    #[tokio::test]
    async fn test_empty_day() {
        let h = Harness::new();
        let report = h.services.summary.run().await.unwrap();

        assert_eq!(report, DailySummaryReport { records: 0, sent: true });
        let attempts = h.notifier.attempts();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].0, ADMIN);
        assert_eq!(attempts[0].1, DAILY_SUMMARY_SUBJECT);
        assert_eq!(attempts[0].2, "No emails were sent today.");
    }

    #[tokio::test]
    async fn test_reports_todays_records_in_order() {
        let h = Harness::new();
        let notifications = &h.services.notifications;

        // Yesterday's record stays out of the window
        notifications
            .dispatch(OutgoingNotification::new("old@x", "s0", "yesterday"))
            .await
            .unwrap();
        h.clock.advance(Duration::days(1));
        notifications
            .dispatch(OutgoingNotification::new("a@x", "s1", "first"))
            .await
            .unwrap();
        notifications
            .dispatch(OutgoingNotification::new("b@x", "s2", "second"))
            .await
            .unwrap();

        let report = h.services.summary.run().await.unwrap();
        assert_eq!(report.records, 2);
        assert!(report.sent);

        let attempts = h.notifier.attempts();
        assert_eq!(attempts.len(), 4);
        let body = &attempts[3].2;
        assert!(body.starts_with("Email Report:\n\n"));
        assert!(!body.contains("old@x"));
        let a = body.find("To: a@x").unwrap();
        let b = body.find("To: b@x").unwrap();
        assert!(a < b);
        assert!(body.contains("Subject: s1"));
        assert!(body.contains("Subject: s2"));
    }

    #[tokio::test]
    async fn test_failed_sends_are_not_reported() {
        let h = Harness::new();
        h.notifier.fail_for("a@x");
        let _ = h
            .services
            .notifications
            .dispatch(OutgoingNotification::new("a@x", "s1", "lost"))
            .await;

        let report = h.services.summary.run().await.unwrap();
        assert_eq!(report.records, 0);
    }

    #[tokio::test]
    async fn test_no_admin_configured() {
        let h = Harness::with_admin(None);
        let report = h.services.summary.run().await.unwrap();
        assert!(!report.sent);
        assert!(h.notifier.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_runs_do_not_double_count() {
        let h = Harness::new();
        h.services
            .notifications
            .dispatch(OutgoingNotification::new("a@x", "s1", "only"))
            .await
            .unwrap();

        let first = h.services.summary.run().await.unwrap();
        assert_eq!(first.records, 1);

        // The second window includes the first summary itself, nothing else
        let second = h.services.summary.run().await.unwrap();
        assert_eq!(second.records, 2);
    }
}
