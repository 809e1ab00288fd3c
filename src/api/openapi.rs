//! OpenAPI documentation

use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

use crate::api::{books, health, loans, notifications};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LibMaster API",
        version = "0.3.0",
        description = "Digital book lending REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Catalog
        books::list_books,
        books::add_bookmark,
        books::remove_bookmark,
        books::list_bookmarks,
        // Loans
        loans::submit_request,
        loans::list_pending,
        loans::approve,
        loans::reject,
        loans::approve_return,
        loans::list_overdue,
        loans::list_borrowed,
        loans::user_stats,
        // Notifications
        notifications::run_overdue_sweep,
        notifications::run_daily_summary,
    ),
    components(
        schemas(
            health::HealthResponse,
            books::BookmarkBody,
            books::MessageResponse,
            crate::models::Book,
            loans::BorrowRequestBody,
            loans::BorrowResponse,
            loans::ReturnResponse,
            crate::models::BorrowStatus,
            crate::models::BorrowRequestDetails,
            crate::models::PatronShort,
            crate::models::BookShort,
            crate::models::PatronStats,
            crate::models::OverdueSweepReport,
            crate::models::DailySummaryReport,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Service health"),
        (name = "books", description = "Catalog and bookmarks"),
        (name = "loans", description = "Borrow request lifecycle"),
        (name = "notifications", description = "Overdue sweep and daily summary")
    )
)]
pub struct ApiDoc;

/// Router serving the OpenAPI document as JSON
pub fn create_openapi_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}
