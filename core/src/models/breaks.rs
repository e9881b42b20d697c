//! Models that capture breaks within a clock session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    error::EngineError,
    types::{BreakId, SessionId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakType {
    #[serde(alias = "morning")]
    Morning,
    #[serde(alias = "afternoon")]
    Afternoon,
    #[serde(alias = "lunch")]
    Lunch,
    #[serde(alias = "away")]
    Away,
}

impl BreakType {
    pub fn as_str(self) -> &'static str {
        match self {
            BreakType::Morning => "MORNING",
            BreakType::Afternoon => "AFTERNOON",
            BreakType::Lunch => "LUNCH",
            BreakType::Away => "AWAY",
        }
    }

    /// Duration handed to the activity monitor when tracking pauses.
    ///
    /// Fixed client-side; the store never supplies it.
    pub fn monitor_duration_minutes(self) -> u32 {
        match self {
            BreakType::Lunch => 60,
            _ => 15,
        }
    }

    pub fn requires_away_reason(self) -> bool {
        self == BreakType::Away
    }
}

impl fmt::Display for BreakType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized break payload, as carried by REST responses and push events.
///
/// Every field except the id is optional: events only carry the fields that
/// changed (`break.ended` is `{id, actualEnd}`). The aliases absorb the mixed
/// casing the event channel uses (`ispaused`, `pausedduration`, ...).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakUpdate {
    pub id: BreakId,
    #[serde(default, alias = "session_id", alias = "timeEntryId", alias = "time_entry_id")]
    pub session_id: Option<SessionId>,
    #[serde(default, rename = "type", alias = "breakType", alias = "break_type")]
    pub break_type: Option<BreakType>,
    #[serde(default, alias = "scheduled_start")]
    pub scheduled_start: Option<DateTime<Utc>>,
    #[serde(default, alias = "scheduled_end")]
    pub scheduled_end: Option<DateTime<Utc>>,
    #[serde(default, alias = "actual_start")]
    pub actual_start: Option<DateTime<Utc>>,
    #[serde(default, alias = "actual_end")]
    pub actual_end: Option<DateTime<Utc>>,
    #[serde(default, alias = "away_reason")]
    pub away_reason: Option<String>,
    #[serde(default, alias = "ispaused", alias = "is_paused")]
    pub is_paused: Option<bool>,
    #[serde(
        default,
        rename = "pausedDurationSeconds",
        alias = "pausedduration",
        alias = "pausedDuration",
        alias = "paused_duration",
        alias = "paused_duration_seconds"
    )]
    pub paused_duration_seconds: Option<i64>,
    #[serde(default, alias = "pauseused", alias = "pause_used")]
    pub pause_used: Option<bool>,
}

impl From<ScheduledBreak> for BreakUpdate {
    fn from(entry: ScheduledBreak) -> Self {
        Self {
            id: entry.id,
            session_id: entry.session_id,
            break_type: Some(entry.break_type),
            scheduled_start: entry.scheduled_start,
            scheduled_end: entry.scheduled_end,
            actual_start: entry.actual_start,
            actual_end: entry.actual_end,
            away_reason: entry.away_reason,
            ..Default::default()
        }
    }
}

/// A planned (or ad-hoc) break slot, optionally actualized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledBreak {
    pub id: BreakId,
    #[serde(default, alias = "session_id")]
    pub session_id: Option<SessionId>,
    #[serde(rename = "type", alias = "breakType", alias = "break_type")]
    pub break_type: BreakType,
    #[serde(default, alias = "scheduled_start")]
    pub scheduled_start: Option<DateTime<Utc>>,
    #[serde(default, alias = "scheduled_end")]
    pub scheduled_end: Option<DateTime<Utc>>,
    #[serde(default, alias = "actual_start")]
    pub actual_start: Option<DateTime<Utc>>,
    #[serde(default, alias = "actual_end")]
    pub actual_end: Option<DateTime<Utc>>,
    #[serde(default, alias = "away_reason")]
    pub away_reason: Option<String>,
}

impl ScheduledBreak {
    /// Builds a new entry from an update, if it carries enough to be valid.
    ///
    /// Requires a break type, and an end is only accepted alongside a start.
    pub fn from_update(update: &BreakUpdate) -> Option<Self> {
        let break_type = update.break_type?;
        if update.actual_end.is_some() && update.actual_start.is_none() {
            return None;
        }
        Some(Self {
            id: update.id.clone(),
            session_id: update.session_id.clone(),
            break_type,
            scheduled_start: update.scheduled_start,
            scheduled_end: update.scheduled_end,
            actual_start: update.actual_start,
            actual_end: update.actual_end,
            away_reason: update.away_reason.clone(),
        })
    }

    /// Returns `true` while the break has started and not yet ended.
    pub fn is_active(&self) -> bool {
        self.actual_start.is_some() && self.actual_end.is_none()
    }

    pub fn has_ended(&self) -> bool {
        self.actual_end.is_some()
    }

    /// Overwrites the fields present in `update`. Absent fields are kept, so
    /// an end timestamp is never cleared once recorded.
    pub fn apply(&mut self, update: &BreakUpdate) {
        if let Some(session_id) = &update.session_id {
            self.session_id = Some(session_id.clone());
        }
        if let Some(break_type) = update.break_type {
            self.break_type = break_type;
        }
        if update.scheduled_start.is_some() {
            self.scheduled_start = update.scheduled_start;
        }
        if update.scheduled_end.is_some() {
            self.scheduled_end = update.scheduled_end;
        }
        if update.actual_start.is_some() {
            self.actual_start = update.actual_start;
        }
        if update.actual_end.is_some() {
            self.actual_end = update.actual_end;
        }
        if let Some(reason) = &update.away_reason {
            self.away_reason = Some(reason.clone());
        }
    }
}

/// The currently running break, including runtime fields the store does not
/// persist identically everywhere.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveBreakState {
    pub id: BreakId,
    #[serde(rename = "type")]
    pub break_type: BreakType,
    pub actual_start: Option<DateTime<Utc>>,
    pub away_reason: Option<String>,
    pub is_paused: bool,
    pub paused_duration_seconds: i64,
    /// A break may be paused at most once; tracked client-side only.
    pub pause_used: bool,
    /// When the current pause began, used to accumulate paused time.
    pub paused_at: Option<DateTime<Utc>>,
}

impl ActiveBreakState {
    /// Builds the active break from an update, filling gaps from the previous
    /// state of the same break. Applying the same update twice yields the same
    /// state.
    pub fn from_update(
        update: &BreakUpdate,
        break_type: BreakType,
        previous: Option<&ActiveBreakState>,
    ) -> Self {
        let previous = previous.filter(|p| p.id == update.id);
        let is_paused = update
            .is_paused
            .or(previous.map(|p| p.is_paused))
            .unwrap_or(false);
        Self {
            id: update.id.clone(),
            break_type,
            actual_start: update
                .actual_start
                .or_else(|| previous.and_then(|p| p.actual_start)),
            away_reason: update
                .away_reason
                .clone()
                .or_else(|| previous.and_then(|p| p.away_reason.clone())),
            is_paused,
            paused_duration_seconds: update
                .paused_duration_seconds
                .or(previous.map(|p| p.paused_duration_seconds))
                .unwrap_or(0),
            pause_used: update.pause_used.unwrap_or(false)
                || previous.is_some_and(|p| p.pause_used),
            paused_at: if is_paused {
                previous.and_then(|p| p.paused_at)
            } else {
                None
            },
        }
    }

    /// Starts the single permitted pause.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), EngineError> {
        if self.is_paused {
            return Err(EngineError::AlreadyPaused);
        }
        if self.pause_used {
            return Err(EngineError::PauseAlreadyUsed);
        }
        self.is_paused = true;
        self.pause_used = true;
        self.paused_at = Some(now);
        Ok(())
    }

    /// Ends the current pause and folds its length into the paused total.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), EngineError> {
        if !self.is_paused {
            return Err(EngineError::NotPaused);
        }
        if let Some(paused_at) = self.paused_at.take() {
            let elapsed = (now - paused_at).num_seconds().max(0);
            self.paused_duration_seconds += elapsed;
        }
        self.is_paused = false;
        Ok(())
    }
}
