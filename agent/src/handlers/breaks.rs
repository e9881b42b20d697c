use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use shiftsync_core::{
    models::{ActiveBreakState, BreakType, ScheduledBreak},
    types::BreakId,
    LocalOnly,
};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartBreakPayload {
    #[serde(rename = "type", alias = "breakType")]
    pub break_type: BreakType,
    #[serde(default)]
    pub away_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndBreakPayload {
    pub break_id: BreakId,
}

/// Body of the local-only pause toggles.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalBreakResponse {
    pub active_break: ActiveBreakState,
    pub persisted: bool,
}

impl From<LocalOnly<ActiveBreakState>> for LocalBreakResponse {
    fn from(LocalOnly(active_break): LocalOnly<ActiveBreakState>) -> Self {
        Self {
            active_break,
            persisted: false,
        }
    }
}

pub async fn start_break(
    State(state): State<AppState>,
    Json(payload): Json<StartBreakPayload>,
) -> Result<Json<ActiveBreakState>, AppError> {
    // An issued command runs to completion even if the client goes away.
    let engine = state.engine.clone();
    let active = tokio::spawn(async move {
        engine
            .start_break(payload.break_type, payload.away_reason)
            .await
    })
    .await??;
    Ok(Json(active))
}

pub async fn end_break(
    State(state): State<AppState>,
    Json(payload): Json<EndBreakPayload>,
) -> Result<Json<Option<ScheduledBreak>>, AppError> {
    let engine = state.engine.clone();
    let closed = tokio::spawn(async move { engine.end_break(payload.break_id).await }).await??;
    Ok(Json(closed))
}

pub async fn pause_break(
    State(state): State<AppState>,
) -> Result<Json<LocalBreakResponse>, AppError> {
    let paused = state.engine.pause_break().await?;
    Ok(Json(paused.into()))
}

pub async fn resume_break(
    State(state): State<AppState>,
) -> Result<Json<LocalBreakResponse>, AppError> {
    let resumed = state.engine.resume_break().await?;
    Ok(Json(resumed.into()))
}
