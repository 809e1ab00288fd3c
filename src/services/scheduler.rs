//! Daily periodic tasks

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use tokio::{sync::watch, task::JoinHandle};

use crate::{error::AppResult, services::clock::Clock};

/// A job the scheduler can fire
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run_once(&self) -> AppResult<()>;
}

/// Fires once per day at a fixed UTC time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyAt(pub NaiveTime);

impl DailyAt {
    /// First firing strictly after `now`
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive().and_time(self.0).and_utc();
        if today > now {
            today
        } else {
            today + Duration::days(1)
        }
    }
}

/// Handle to a running periodic task.
///
/// The task awaits each invocation before computing the next firing, so
/// scheduled invocations never overlap; jobs serialize manual runs against
/// scheduled ones themselves. A failed invocation is logged and the next
/// firing proceeds normally.
pub struct PeriodicTask {
    job: Arc<dyn ScheduledJob>,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    pub fn start(job: Arc<dyn ScheduledJob>, schedule: DailyAt, clock: Arc<dyn Clock>) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let runner = Arc::clone(&job);

        let handle = tokio::spawn(async move {
            tracing::info!(job = runner.name(), at = %schedule.0, "Scheduled task started");
            loop {
                let now = clock.now();
                let next = schedule.next_after(now);
                let wait = (next - now).to_std().unwrap_or_default();
                tracing::debug!(job = runner.name(), %next, "Next run scheduled");

                tokio::select! {
                    _ = tokio::time::sleep(wait) => {
                        run_logged(runner.as_ref()).await;
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
            tracing::info!(job = runner.name(), "Scheduled task stopped");
        });

        Self {
            job,
            shutdown,
            handle,
        }
    }

    /// Run the job immediately, outside the schedule
    pub async fn run_now(&self) -> AppResult<()> {
        self.job.run_once().await
    }

    pub fn name(&self) -> &'static str {
        self.job.name()
    }

    /// Signal the task and wait for the current invocation, if any, to finish
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            tracing::error!(job = self.job.name(), "Scheduled task panicked: {}", e);
        }
    }
}

async fn run_logged(job: &dyn ScheduledJob) {
    tracing::info!(job = job.name(), "Running scheduled job");
    if let Err(e) = job.run_once().await {
        tracing::error!(job = job.name(), "Scheduled job failed: {}", e);
    }
}
