//! Manual triggers for the scheduled notification jobs

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::{DailySummaryReport, OverdueSweepReport},
};

/// Run the overdue sweep now
#[utoipa::path(
    post,
    path = "/notifications/overdue",
    tag = "notifications",
    responses(
        (status = 200, description = "Sweep completed", body = OverdueSweepReport)
    )
)]
pub async fn run_overdue_sweep(
    State(state): State<crate::AppState>,
) -> AppResult<Json<OverdueSweepReport>> {
    Ok(Json(state.services.overdue.run().await?))
}

/// Send today's summary now
#[utoipa::path(
    post,
    path = "/notifications/summary",
    tag = "notifications",
    responses(
        (status = 200, description = "Summary completed", body = DailySummaryReport)
    )
)]
pub async fn run_daily_summary(
    State(state): State<crate::AppState>,
) -> AppResult<Json<DailySummaryReport>> {
    Ok(Json(state.services.summary.run().await?))
}
