use serde::{Deserialize, Serialize};

use crate::{
    models::{BreakType, BreakUpdate, ClockSession, ScheduledBreak, WorkSchedule, WorkStats},
    types::BreakId,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockOutRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartBreakRequest {
    #[serde(rename = "type")]
    pub break_type: BreakType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub away_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndBreakRequest {
    pub break_id: BreakId,
}

/// `GET /status` body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(default, alias = "is_clocked_in")]
    pub is_clocked_in: bool,
    #[serde(default, alias = "active_entry")]
    pub active_entry: Option<ClockSession>,
    #[serde(default, alias = "active_break")]
    pub active_break: Option<BreakUpdate>,
    #[serde(default, alias = "work_schedules")]
    pub work_schedules: Vec<WorkSchedule>,
}

/// `GET /entries` body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EntriesResponse {
    #[serde(default)]
    pub entries: Vec<ClockSession>,
    #[serde(default)]
    pub stats: WorkStats,
}

/// Full authoritative state, either pulled over REST or pushed as a
/// `state.snapshot` event. Parts a pushed snapshot omits stay untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    pub status: StatusResponse,
    pub history: Option<EntriesResponse>,
    pub scheduled_breaks: Option<Vec<ScheduledBreak>>,
}

/// Error body returned by the store on non-success statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    #[serde(alias = "message")]
    pub error: String,
}
