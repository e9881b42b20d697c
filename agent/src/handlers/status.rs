use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};
use shiftsync_core::{models::EngineSnapshot, SnapshotOutcome};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub outcome: SnapshotOutcome,
}

pub async fn get_state(State(state): State<AppState>) -> Json<EngineSnapshot> {
    Json(state.engine.snapshot())
}

pub async fn refresh(State(state): State<AppState>) -> Result<Json<RefreshResponse>, AppError> {
    let outcome = state.engine.refresh_snapshot().await?;
    Ok(Json(RefreshResponse { outcome }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
