//! Event channel ingestion.
//!
//! Frames arrive as `{"type": "...", "payload": {...}}` text (some producers
//! use `event`/`data`). Each is normalized here into a [`SyncEvent`]; nothing
//! past this module sees raw payloads.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::{
    models::{BreakType, BreakUpdate, ClockSession, ScheduledBreak, WorkStats},
    store::{EntriesResponse, StatusResponse, StoreSnapshot},
    types::{BreakId, UserId},
};

pub const SESSION_STARTED: &str = "session.started";
pub const SESSION_ENDED: &str = "session.ended";
pub const BREAK_STARTED: &str = "break.started";
pub const BREAK_ENDED: &str = "break.ended";
pub const BREAK_PAUSED: &str = "break.paused";
pub const BREAK_RESUMED: &str = "break.resumed";
pub const BREAK_AUTO_START_TRIGGER: &str = "break.autoStartTrigger";
pub const STATE_SNAPSHOT: &str = "state.snapshot";

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    SessionStarted(ClockSession),
    SessionEnded(ClockSession),
    BreakStarted(BreakUpdate),
    BreakEnded(BreakUpdate),
    BreakPaused(BreakUpdate),
    BreakResumed(BreakUpdate),
    AutoStartTrigger(AutoStartTrigger),
    Snapshot(Box<StoreSnapshot>),
}

/// Scheduler nudge asking one specific user's client to start a break.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoStartTrigger {
    #[serde(alias = "break_id")]
    pub break_id: BreakId,
    #[serde(alias = "break_type", alias = "type")]
    pub break_type: BreakType,
    #[serde(alias = "staff_user_id", alias = "userId", alias = "user_id")]
    pub staff_user_id: UserId,
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("event frame is not a valid envelope: {0}")]
    InvalidFrame(#[source] serde_json::Error),
    #[error("malformed `{kind}` payload: {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type", alias = "event", alias = "name")]
    kind: String,
    #[serde(default, alias = "data")]
    payload: Value,
}

#[derive(Deserialize)]
struct SessionPayload {
    #[serde(
        rename = "timeEntry",
        alias = "time_entry",
        alias = "entry",
        alias = "session"
    )]
    time_entry: ClockSession,
}

#[derive(Deserialize)]
struct BreakPayload {
    #[serde(rename = "break", alias = "scheduledBreak", alias = "scheduled_break")]
    record: BreakUpdate,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotPayload {
    #[serde(flatten)]
    status: StatusResponse,
    #[serde(default)]
    entries: Option<Vec<ClockSession>>,
    #[serde(default)]
    stats: Option<WorkStats>,
    #[serde(default, alias = "scheduled_breaks")]
    scheduled_breaks: Option<Vec<ScheduledBreak>>,
}

impl From<SnapshotPayload> for StoreSnapshot {
    fn from(payload: SnapshotPayload) -> Self {
        let history = match (payload.entries, payload.stats) {
            (None, None) => None,
            (entries, stats) => Some(EntriesResponse {
                entries: entries.unwrap_or_default(),
                stats: stats.unwrap_or_default(),
            }),
        };
        StoreSnapshot {
            status: payload.status,
            history,
            scheduled_breaks: payload.scheduled_breaks,
        }
    }
}

impl SyncEvent {
    /// Parses one text frame. Unknown event types yield `Ok(None)`.
    pub fn parse(frame: &str) -> Result<Option<Self>, EventError> {
        let envelope: Envelope = serde_json::from_str(frame).map_err(EventError::InvalidFrame)?;
        Self::from_parts(&envelope.kind, envelope.payload)
    }

    pub fn from_parts(kind: &str, payload: Value) -> Result<Option<Self>, EventError> {
        let malformed = |source| EventError::Malformed {
            kind: kind.to_string(),
            source,
        };
        let event = match kind {
            SESSION_STARTED => Self::SessionStarted(
                serde_json::from_value::<SessionPayload>(payload)
                    .map_err(malformed)?
                    .time_entry,
            ),
            SESSION_ENDED => Self::SessionEnded(
                serde_json::from_value::<SessionPayload>(payload)
                    .map_err(malformed)?
                    .time_entry,
            ),
            BREAK_STARTED => Self::BreakStarted(
                serde_json::from_value::<BreakPayload>(payload)
                    .map_err(malformed)?
                    .record,
            ),
            BREAK_ENDED => Self::BreakEnded(
                serde_json::from_value::<BreakPayload>(payload)
                    .map_err(malformed)?
                    .record,
            ),
            BREAK_PAUSED => Self::BreakPaused(
                serde_json::from_value::<BreakPayload>(payload)
                    .map_err(malformed)?
                    .record,
            ),
            BREAK_RESUMED => Self::BreakResumed(
                serde_json::from_value::<BreakPayload>(payload)
                    .map_err(malformed)?
                    .record,
            ),
            BREAK_AUTO_START_TRIGGER => {
                Self::AutoStartTrigger(serde_json::from_value(payload).map_err(malformed)?)
            }
            STATE_SNAPSHOT => {
                let payload: SnapshotPayload =
                    serde_json::from_value(payload).map_err(malformed)?;
                Self::Snapshot(Box::new(payload.into()))
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SyncEvent::SessionStarted(_) => SESSION_STARTED,
            SyncEvent::SessionEnded(_) => SESSION_ENDED,
            SyncEvent::BreakStarted(_) => BREAK_STARTED,
            SyncEvent::BreakEnded(_) => BREAK_ENDED,
            SyncEvent::BreakPaused(_) => BREAK_PAUSED,
            SyncEvent::BreakResumed(_) => BREAK_RESUMED,
            SyncEvent::AutoStartTrigger(_) => BREAK_AUTO_START_TRIGGER,
            SyncEvent::Snapshot(_) => STATE_SNAPSHOT,
        }
    }
}
