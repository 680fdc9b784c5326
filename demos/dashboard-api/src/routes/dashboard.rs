use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use floorwatch::{CycleReport, DashboardView};

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/dashboard
///
/// Current fee-adjusted floor prices, totals and rate timestamp.
pub async fn get_dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardView> {
    Json(state.tracker.dashboard())
}

/// POST /api/refresh
///
/// Run one refresh cycle now instead of waiting for the scheduler.
pub async fn refresh(State(state): State<Arc<AppState>>) -> Result<Json<CycleReport>, AppError> {
    let report = state.tracker.refresh().await?;
    if !report.collected {
        return Err(AppError::bad_gateway("collection failed; kept previous prices"));
    }
    Ok(Json(report))
}
