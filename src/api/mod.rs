//! API handlers for LibMaster REST endpoints

pub mod books;
pub mod health;
pub mod loans;
pub mod notifications;
pub mod openapi;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Catalog and bookmarks
        .route("/books", get(books::list_books))
        .route(
            "/books/:book_id/bookmark",
            post(books::add_bookmark).delete(books::remove_bookmark),
        )
        .route("/users/:id/bookmarks", get(books::list_bookmarks))
        // Borrow lifecycle
        .route("/books/:book_id/borrow", post(loans::submit_request))
        .route("/borrow-requests", get(loans::list_pending))
        .route("/borrow-requests/:id/approve", post(loans::approve))
        .route("/borrow-requests/:id/reject", post(loans::reject))
        .route("/borrow-requests/:id/return", post(loans::approve_return))
        // Patron projections
        .route("/users/:id/overdue", get(loans::list_overdue))
        .route("/users/:id/borrowed", get(loans::list_borrowed))
        .route("/users/:id/stats", get(loans::user_stats))
        // Scheduled jobs, on demand
        .route("/notifications/overdue", post(notifications::run_overdue_sweep))
        .route("/notifications/summary", post(notifications::run_daily_summary))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
