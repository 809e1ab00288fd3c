//! Business logic services

pub mod catalog;
pub mod clock;
pub mod due_date;
pub mod email;
pub mod loans;
pub mod notifications;
pub mod overdue;
pub mod scheduler;
pub mod summary;

use std::sync::Arc;

use crate::{
    config::NotificationsConfig,
    repository::{Repository, StoreHealth},
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub loans: loans::LoansService,
    pub catalog: catalog::CatalogService,
    pub notifications: notifications::NotificationService,
    pub overdue: overdue::OverdueSweep,
    pub summary: summary::DailySummary,
    /// Backing store ping for readiness checks
    pub store_health: Arc<dyn StoreHealth>,
}

impl Services {
    /// Wire every service over the given repository, notifier and clock
    pub fn new(
        repository: Repository,
        notifier: Arc<dyn email::Notifier>,
        clock: Arc<dyn clock::Clock>,
        config: &NotificationsConfig,
    ) -> Self {
        let notifications = notifications::NotificationService::new(
            notifier,
            repository.email_logs.clone(),
            clock.clone(),
        );

        Self {
            overdue: overdue::OverdueSweep::new(
                repository.requests.clone(),
                notifications.clone(),
                clock.clone(),
                config.admin_email.clone(),
            ),
            summary: summary::DailySummary::new(
                notifications.clone(),
                clock.clone(),
                config.admin_email.clone(),
            ),
            catalog: catalog::CatalogService::new(repository.clone(), clock.clone()),
            store_health: repository.health.clone(),
            loans: loans::LoansService::new(repository, notifications.clone(), clock),
            notifications,
        }
    }
}

/// Handles of the two daily jobs
pub struct Scheduler {
    pub overdue_sweep: scheduler::PeriodicTask,
    pub daily_summary: scheduler::PeriodicTask,
}

impl Scheduler {
    pub fn start(services: &Services, clock: Arc<dyn clock::Clock>, config: &NotificationsConfig) -> Self {
        Self {
            overdue_sweep: scheduler::PeriodicTask::start(
                Arc::new(services.overdue.clone()),
                scheduler::DailyAt(config.overdue_sweep_at),
                clock.clone(),
            ),
            daily_summary: scheduler::PeriodicTask::start(
                Arc::new(services.summary.clone()),
                scheduler::DailyAt(config.daily_summary_at),
                clock,
            ),
        }
    }

    pub async fn stop(self) {
        self.overdue_sweep.stop().await;
        self.daily_summary.stop().await;
    }
}
