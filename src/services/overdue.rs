//! Overdue sweep

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    error::AppResult,
    models::{OutgoingNotification, OverdueSweepReport},
    repository::BorrowRequestsRepository,
    services::{
        clock::Clock, loans::format_due_date, notifications::NotificationService,
        scheduler::ScheduledJob,
    },
};

pub const NO_OVERDUE_SUBJECT: &str = "LibMaster - No Overdue Books";
pub const OVERDUE_NOTICE_SUBJECT: &str = "Overdue Book Notice - LibMaster";
pub const ADMIN_ROSTER_SUBJECT: &str = "Overdue Book Notifications Sent";

/// Scans unreturned loans past their due date and notifies patrons and the
/// administrator. Read-only over the lifecycle store.
#[derive(Clone)]
pub struct OverdueSweep {
    requests: Arc<dyn BorrowRequestsRepository>,
    notifications: NotificationService,
    clock: Arc<dyn Clock>,
    admin_email: Option<String>,
    /// Held for the whole invocation
    running: Arc<Mutex<()>>,
}

impl OverdueSweep {
    pub fn new(
        requests: Arc<dyn BorrowRequestsRepository>,
        notifications: NotificationService,
        clock: Arc<dyn Clock>,
        admin_email: Option<String>,
    ) -> Self {
        Self {
            requests,
            notifications,
            clock,
            admin_email,
            running: Arc::new(Mutex::new(())),
        }
    }

    /// Run one sweep. Only a failing overdue query aborts the run;
    /// individual delivery failures are counted and skipped.
    pub async fn run(&self) -> AppResult<OverdueSweepReport> {
        let _running = self.running.lock().await;
        let now = self.clock.now();
        let overdue = self.requests.list_overdue(now, None).await?;

        let mut report = OverdueSweepReport {
            overdue: overdue.len(),
            ..OverdueSweepReport::default()
        };

        if overdue.is_empty() {
            tracing::info!("Overdue sweep: no overdue books");
            report.admin_notified = self
                .notify_admin(NO_OVERDUE_SUBJECT, "No overdue books today.".to_string())
                .await;
            return Ok(report);
        }

        for request in &overdue {
            let Some(email) = request
                .user
                .email
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty())
            else {
                tracing::warn!(request_id = %request.id, user_id = %request.user.id, "Overdue patron has no email");
                report.skipped += 1;
                continue;
            };

            let due = request
                .due_date
                .map(format_due_date)
                .unwrap_or_else(|| "an unknown date".to_string());
            let body = format!(
                "Dear {},\n\nYour book \"{}\" was due on {}. Please return it ASAP.\n\nLibMaster Team.",
                request.user.name, request.book.title, due
            );

            if self
                .notifications
                .dispatch(OutgoingNotification::new(email, OVERDUE_NOTICE_SUBJECT, body))
                .await
                .is_err()
            {
                report.failed += 1;
            }
            report.notified.push(format!("{} ({})", request.user.name, email));
        }

        if !report.notified.is_empty() {
            let body = format!("Notified students:\n\n{}", report.notified.join("\n"));
            report.admin_notified = self.notify_admin(ADMIN_ROSTER_SUBJECT, body).await;
        }

        tracing::info!(
            overdue = report.overdue,
            notified = report.notified.len(),
            skipped = report.skipped,
            failed = report.failed,
            "Overdue sweep completed"
        );

        Ok(report)
    }

    async fn notify_admin(&self, subject: &str, body: String) -> bool {
        let Some(admin) = self.admin_email.as_deref() else {
            tracing::warn!("No admin email configured, skipping '{}'", subject);
            return false;
        };
        self.notifications
            .dispatch(OutgoingNotification::new(admin, subject, body))
            .await
            .is_ok()
    }
}

#[async_trait]
impl ScheduledJob for OverdueSweep {
    fn name(&self) -> &'static str {
        "overdue-sweep"
    }

    async fn run_once(&self) -> AppResult<()> {
        self.run().await.map(|_| ())
    }
}
