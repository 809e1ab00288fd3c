//! Borrow lifecycle and scheduled jobs, driven through the services

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};

use libmaster_server::{
    config::NotificationsConfig,
    models::{Book, BorrowStatus, Patron},
    repository::{BooksRepository, MemoryStore, Repository},
    services::{
        clock::{Clock, ManualClock},
        email::Notifier,
        Scheduler, Services,
    },
    AppError, AppResult,
};

const ADMIN: &str = "admin@libmaster.org";

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<(String, String)>>,
    unreachable: Mutex<HashSet<String>>,
}

#[async_trait]
impl Notifier for Outbox {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> AppResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string()));
        if self.unreachable.lock().unwrap().contains(to) {
            return Err(AppError::Transport(format!("{} unreachable", to)));
        }
        Ok(())
    }
}

struct World {
    store: MemoryStore,
    clock: ManualClock,
    outbox: Arc<Outbox>,
    services: Services,
    config: NotificationsConfig,
}

impl World {
    fn new() -> Self {
        let config = NotificationsConfig {
            admin_email: Some(ADMIN.to_string()),
            ..NotificationsConfig::default()
        };
        let store = MemoryStore::new();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap());
        let outbox = Arc::new(Outbox::default());
        let services = Services::new(
            Repository::in_memory(store.clone()),
            outbox.clone(),
            Arc::new(clock.clone()),
            &config,
        );
        Self {
            store,
            clock,
            outbox,
            services,
            config,
        }
    }

    async fn patron(&self, name: &str, email: &str) -> Patron {
        let patron = Patron::new(name, Some(email.to_string()));
        self.store.insert_patron(patron.clone()).await;
        patron
    }

    async fn book(&self, title: &str) -> Book {
        let book = Book::new(title);
        self.store.insert_book(book.clone()).await;
        book
    }

    async fn available(&self, book: &Book) -> bool {
        BooksRepository::get_by_id(&self.store, book.id)
            .await
            .unwrap()
            .available
    }

    fn sent(&self) -> Vec<(String, String)> {
        self.outbox.sent.lock().unwrap().clone()
    }
}

#[tokio::test]
async fn test_end_to_end_with_scheduled_jobs() {
    let w = World::new();
    let scheduler = Scheduler::start(&w.services, Arc::new(w.clock.clone()), &w.config);
    let ada = w.patron("Ada", "ada@example.org").await;
    let dune = w.book("Dune").await;

    let request = w.services.loans.submit_request(ada.id, dune.id).await.unwrap();
    assert_eq!(request.status, BorrowStatus::Pending);
    assert!(w.available(&dune).await);

    let approved = w.services.loans.approve(request.id).await.unwrap();
    assert_eq!(approved.due_date, Some(w.clock.now() + Duration::days(14)));
    assert!(!w.available(&dune).await);

    w.clock.advance(Duration::days(15));
    let before = w.sent().len();
    scheduler.overdue_sweep.run_now().await.unwrap();
    let sweep: Vec<_> = w.sent()[before..].to_vec();
    assert_eq!(
        sweep,
        vec![
            ("ada@example.org".to_string(), "Overdue Book Notice - LibMaster".to_string()),
            (ADMIN.to_string(), "Overdue Book Notifications Sent".to_string()),
        ]
    );

    let outcome = w.services.loans.approve_return(request.id).await.unwrap();
    assert_eq!(outcome.request.status, BorrowStatus::Returned);
    assert_eq!(outcome.books_read, 1);
    assert!(w.available(&dune).await);

    // Overdue notice, admin roster and return confirmation
    scheduler.daily_summary.run_now().await.unwrap();
    let ledger = w
        .services
        .notifications
        .sent_since(w.clock.now() - Duration::hours(10))
        .await
        .unwrap();
    assert_eq!(ledger.len(), 4);
    assert_eq!(ledger[3].subject, "LibMaster Daily Summary");

    scheduler.stop().await;
}

#[tokio::test]
async fn test_returns_are_counted_once() {
    let w = World::new();
    let ada = w.patron("Ada", "ada@example.org").await;

    for title in ["Dune", "Emma", "Ulysses"] {
        let book = w.book(title).await;
        let request = w.services.loans.submit_request(ada.id, book.id).await.unwrap();
        w.services.loans.approve(request.id).await.unwrap();
        w.services.loans.approve_return(request.id).await.unwrap();

        let err = w.services.loans.approve_return(request.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
    }

    let stats = w.services.loans.user_stats(ada.id).await.unwrap();
    assert_eq!(stats.books_read, 3);
}

#[tokio::test]
async fn test_failed_confirmation_does_not_fail_approval() {
    let w = World::new();
    let ada = w.patron("Ada", "ada@example.org").await;
    let dune = w.book("Dune").await;
    w.outbox
        .unreachable
        .lock()
        .unwrap()
        .insert("ada@example.org".to_string());

    let request = w.services.loans.submit_request(ada.id, dune.id).await.unwrap();
    let approved = w.services.loans.approve(request.id).await.unwrap();
    assert_eq!(approved.status, BorrowStatus::Approved);

    // Attempted but left no ledger trace
    assert_eq!(w.sent().len(), 1);
    let ledger = w
        .services
        .notifications
        .sent_since(w.clock.now() - Duration::days(1))
        .await
        .unwrap();
    assert!(ledger.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_approvals_claim_book_once() {
    let w = World::new();
    let dune = w.book("Dune").await;

    let mut requests = Vec::new();
    for i in 0..8 {
        let patron = w.patron(&format!("Patron {}", i), &format!("p{}@example.org", i)).await;
        requests.push(w.services.loans.submit_request(patron.id, dune.id).await.unwrap());
    }

    let handles: Vec<_> = requests
        .iter()
        .map(|request| {
            let loans = w.services.loans.clone();
            let id = request.id;
            tokio::spawn(async move { loans.approve(id).await })
        })
        .collect();

    let mut approved = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => approved += 1,
            Err(AppError::ResourceUnavailable(_)) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(approved, 1);
    assert!(!w.available(&dune).await);
    let on_loan = w
        .store
        .requests()
        .await
        .into_iter()
        .filter(|r| r.status == BorrowStatus::Approved)
        .count();
    assert_eq!(on_loan, 1);
}
