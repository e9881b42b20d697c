//! Fixtures shared by this crate's tests and downstream crates' tests.
//!
//! Enabled by the `test-utils` feature.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Mutex;

use crate::{
    models::{BreakType, BreakUpdate, ClockSession, ScheduledBreak, SessionStatus},
    monitor::{ActivityMonitor, MonitorError, PauseRequest},
    store::{EntriesResponse, StatusResponse, StoreSnapshot},
    types::{BreakId, SessionId, UserId},
};

/// A call observed by [`RecordingMonitor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorCall {
    Pause(PauseRequest),
    Resume,
}

/// Activity monitor that records every call and always succeeds.
#[derive(Debug, Default)]
pub struct RecordingMonitor {
    calls: Mutex<Vec<MonitorCall>>,
}

impl RecordingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<MonitorCall> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: MonitorCall) {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(call);
    }
}

#[async_trait]
impl ActivityMonitor for RecordingMonitor {
    async fn pause(&self, request: &PauseRequest) -> Result<(), MonitorError> {
        self.record(MonitorCall::Pause(request.clone()));
        Ok(())
    }

    async fn resume(&self) -> Result<(), MonitorError> {
        self.record(MonitorCall::Resume);
        Ok(())
    }
}

pub const USER: &str = "u1";

/// 2025-01-02 at `hour:minute` UTC.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 2, hour, minute, 0)
        .single()
        .expect("valid fixture time")
}

pub fn open_session(id: &str, clock_in: DateTime<Utc>) -> ClockSession {
    ClockSession {
        id: SessionId::new(id),
        owner_id: Some(UserId::new(USER)),
        clock_in_at: clock_in,
        clock_out_at: None,
        status: SessionStatus::Active,
    }
}

pub fn closed_session(id: &str, clock_in: DateTime<Utc>, clock_out: DateTime<Utc>) -> ClockSession {
    ClockSession {
        clock_out_at: Some(clock_out),
        status: SessionStatus::Closed,
        ..open_session(id, clock_in)
    }
}

/// What the store answers to a successful `POST /breaks/start`.
pub fn started_break(id: &str, break_type: BreakType, start: DateTime<Utc>) -> BreakUpdate {
    BreakUpdate {
        id: BreakId::new(id),
        break_type: Some(break_type),
        actual_start: Some(start),
        is_paused: Some(false),
        paused_duration_seconds: Some(0),
        pause_used: Some(false),
        ..Default::default()
    }
}

/// What the store answers to a successful `POST /breaks/end`.
pub fn ended_break(id: &str, end: DateTime<Utc>) -> BreakUpdate {
    BreakUpdate {
        id: BreakId::new(id),
        actual_end: Some(end),
        ..Default::default()
    }
}

pub fn planned_break(id: &str, break_type: BreakType, start: DateTime<Utc>) -> ScheduledBreak {
    ScheduledBreak {
        id: BreakId::new(id),
        session_id: None,
        break_type,
        scheduled_start: Some(start),
        scheduled_end: None,
        actual_start: None,
        actual_end: None,
        away_reason: None,
    }
}

/// Store state of a clocked-in user with no break running.
pub fn clocked_in_snapshot(session: ClockSession) -> StoreSnapshot {
    StoreSnapshot {
        status: StatusResponse {
            is_clocked_in: true,
            active_entry: Some(session.clone()),
            active_break: None,
            work_schedules: Vec::new(),
        },
        history: Some(EntriesResponse {
            entries: vec![session],
            stats: Default::default(),
        }),
        scheduled_breaks: Some(Vec::new()),
    }
}
