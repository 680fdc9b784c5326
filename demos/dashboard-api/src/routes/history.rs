use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Json;
use floorwatch::PriceHistory;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/history
///
/// Combined series plus one series per collection, keyed by symbol.
pub async fn all_history(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let combined = state.tracker.combined_history().await?;
    let entities = state.tracker.all_entity_histories().await?;
    Ok(Json(json!({ "combined": combined, "entities": entities })))
}

/// GET /api/history/combined
pub async fn combined_history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PriceHistory>, AppError> {
    Ok(Json(state.tracker.combined_history().await?))
}

/// GET /api/history/{symbol}
///
/// Day series for one tracked collection.
pub async fn entity_history(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<PriceHistory>, AppError> {
    if !state.tracker.inner().entities().contains(&symbol) {
        return Err(AppError::not_found(format!("Collection not tracked: {symbol}")));
    }
    Ok(Json(state.tracker.entity_history(&symbol).await?))
}
