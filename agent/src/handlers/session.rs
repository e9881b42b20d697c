use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use shiftsync_core::{models::ClockSession, store::ClockOutRequest};

use crate::{error::AppError, state::AppState};

pub async fn clock_in(State(state): State<AppState>) -> Result<Json<ClockSession>, AppError> {
    let session = state.engine.clock_in().await?;
    Ok(Json(session))
}

/// Accepts the clock-out and completes it in the background. Failures reach
/// the caller through the engine's notice channel, not this response.
pub async fn clock_out(
    State(state): State<AppState>,
    Json(payload): Json<ClockOutRequest>,
) -> (StatusCode, Json<Value>) {
    let engine = state.engine.clone();
    tokio::spawn(async move {
        engine.clock_out(payload).await;
    });
    (StatusCode::ACCEPTED, Json(json!({ "accepted": true })))
}
