use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /api/meta
///
/// Returns the tracked collections, currencies and display fee.
pub async fn get_meta(State(state): State<Arc<AppState>>) -> Json<Value> {
    let tracker = state.tracker.inner();
    Json(json!({
        "entities": tracker.entities(),
        "baseAsset": tracker.base_asset(),
        "currencies": tracker.currencies(),
        "feeMultiplier": tracker.fee_multiplier().to_string(),
        "refreshIntervalSecs": tracker.refresh_interval().as_secs(),
    }))
}
