//! Synchronous reconciliation state.
//!
//! Everything here runs under the engine's lock and never awaits. Store calls
//! and monitor calls happen outside, in [`super::SyncEngine`]; this module only
//! decides what the canonical view looks like and which monitor calls a
//! transition requires.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tokio::time::{Duration, Instant};

use crate::{
    error::EngineError,
    events::{AutoStartTrigger, SyncEvent},
    models::{
        ActiveBreakState, BreakType, BreakUpdate, ClockSession, EngineSnapshot, ScheduledBreak,
        WorkSchedule,
    },
    monitor::PauseRequest,
    store::StoreSnapshot,
    types::{BreakId, UserId},
};

/// A call the engine owes the activity monitor after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MonitorAction {
    Pause(PauseRequest),
    Resume,
}

/// What applying an event amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Applied,
    Ignored,
    /// An auto-start trigger for this user asked for a break of this type.
    StartBreak(BreakType),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BreakCommand {
    Start,
    End,
}

#[derive(Debug)]
pub(crate) struct EngineState {
    user_id: UserId,
    suppression_window: Duration,
    snapshot: EngineSnapshot,
    /// Breaks known to have ended; a late `break.started` for these is stale.
    ended_breaks: HashSet<BreakId>,
    /// Auto-start triggers already acted upon.
    triggered_breaks: HashSet<BreakId>,
    /// Break the monitor is currently paused for.
    monitored_break: Option<BreakId>,
    last_event_at: Option<Instant>,
    break_command_in_flight: bool,
}

impl EngineState {
    pub(crate) fn new(user_id: UserId, suppression_window: Duration) -> Self {
        Self {
            user_id,
            suppression_window,
            snapshot: EngineSnapshot::default(),
            ended_breaks: HashSet::new(),
            triggered_breaks: HashSet::new(),
            monitored_break: None,
            last_event_at: None,
            break_command_in_flight: false,
        }
    }

    pub(crate) fn snapshot(&self) -> &EngineSnapshot {
        &self.snapshot
    }

    pub(crate) fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Opens the suppression window.
    pub(crate) fn mark_fresh(&mut self, now: Instant) {
        self.last_event_at = Some(now);
    }

    pub(crate) fn is_suppressed(&self, now: Instant) -> bool {
        self.last_event_at
            .is_some_and(|at| now.duration_since(at) < self.suppression_window)
    }

    // ---- commands -------------------------------------------------------

    pub(crate) fn begin_break_command(&mut self, command: BreakCommand) -> Result<(), EngineError> {
        match command {
            BreakCommand::Start => {
                if !self.snapshot.is_clocked_in {
                    return Err(EngineError::NotClockedIn);
                }
                if self.snapshot.active_break.is_some() {
                    return Err(EngineError::BreakAlreadyActive);
                }
            }
            BreakCommand::End => {
                if self.snapshot.active_break.is_none() {
                    return Err(EngineError::NoActiveBreak);
                }
            }
        }
        if self.break_command_in_flight {
            return Err(EngineError::CommandInFlight);
        }
        self.break_command_in_flight = true;
        Ok(())
    }

    pub(crate) fn finish_break_command(&mut self) {
        self.break_command_in_flight = false;
    }

    /// Applies the store's answer to `end_break(requested)`.
    ///
    /// The entry with the requested id is updated. When the scheduled list has
    /// no such entry, the most recent open break is closed instead.
    pub(crate) fn apply_break_end_result(
        &mut self,
        requested: &BreakId,
        mut result: BreakUpdate,
        now: DateTime<Utc>,
    ) -> Option<ScheduledBreak> {
        let ended_at = *result.actual_end.get_or_insert(now);
        let active = self.snapshot.active_break.take();
        self.ended_breaks.insert(requested.clone());
        self.ended_breaks.insert(result.id.clone());

        let breaks = &mut self.snapshot.scheduled_breaks;
        if let Some(entry) = breaks.iter_mut().find(|b| b.id == *requested) {
            result.id = entry.id.clone();
            if result.actual_start.is_none() && entry.actual_start.is_none() {
                result.actual_start = active.and_then(|a| a.actual_start);
            }
            entry.apply(&result);
            return Some(entry.clone());
        }

        match most_recent_open_break(breaks) {
            Some(index) => {
                let entry = &mut breaks[index];
                tracing::debug!(
                    requested = %requested,
                    closed = %entry.id,
                    "Ended break not in scheduled list; closing most recent open break"
                );
                entry.actual_end = Some(ended_at);
                self.ended_breaks.insert(entry.id.clone());
                Some(entry.clone())
            }
            None => {
                tracing::debug!(requested = %requested, "No scheduled entry to close for ended break");
                None
            }
        }
    }

    pub(crate) fn pause_active_break(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<ActiveBreakState, EngineError> {
        let active = self
            .snapshot
            .active_break
            .as_mut()
            .ok_or(EngineError::NoActiveBreak)?;
        active.pause(now)?;
        Ok(active.clone())
    }

    pub(crate) fn resume_active_break(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<ActiveBreakState, EngineError> {
        let active = self
            .snapshot
            .active_break
            .as_mut()
            .ok_or(EngineError::NoActiveBreak)?;
        active.resume(now)?;
        Ok(active.clone())
    }

    // ---- events ---------------------------------------------------------

    pub(crate) fn apply_event(
        &mut self,
        event: SyncEvent,
        now: Instant,
        wall_clock: DateTime<Utc>,
    ) -> EventOutcome {
        if !matches!(event, SyncEvent::AutoStartTrigger(_)) {
            self.mark_fresh(now);
        }
        match event {
            SyncEvent::AutoStartTrigger(trigger) => return self.evaluate_trigger(&trigger),
            SyncEvent::SessionStarted(session) => self.apply_session_started(session),
            SyncEvent::SessionEnded(session) => self.apply_session_ended(session),
            SyncEvent::BreakStarted(update) => {
                self.apply_break_started(update);
            }
            SyncEvent::BreakEnded(update) => self.apply_break_ended(update, wall_clock),
            SyncEvent::BreakPaused(update) => self.apply_break_pause_change(update, true, wall_clock),
            SyncEvent::BreakResumed(update) => {
                self.apply_break_pause_change(update, false, wall_clock)
            }
            SyncEvent::Snapshot(snapshot) => self.replace_snapshot(*snapshot),
        }
        EventOutcome::Applied
    }

    fn evaluate_trigger(&mut self, trigger: &AutoStartTrigger) -> EventOutcome {
        if trigger.staff_user_id != self.user_id {
            tracing::debug!(
                target_user = %trigger.staff_user_id,
                break_id = %trigger.break_id,
                "Ignoring auto-start trigger addressed to another user"
            );
            return EventOutcome::Ignored;
        }
        if self.triggered_breaks.contains(&trigger.break_id) {
            return EventOutcome::Ignored;
        }
        if trigger.break_type.requires_away_reason() {
            tracing::warn!(break_id = %trigger.break_id, "Auto-start trigger for AWAY break cannot supply a reason");
            return EventOutcome::Ignored;
        }
        if !self.snapshot.is_clocked_in
            || self.snapshot.active_break.is_some()
            || self.break_command_in_flight
        {
            tracing::debug!(break_id = %trigger.break_id, "Auto-start trigger does not apply in current state");
            return EventOutcome::Ignored;
        }
        // Only a trigger that actually starts a break is consumed.
        self.triggered_breaks.insert(trigger.break_id.clone());
        EventOutcome::StartBreak(trigger.break_type)
    }

    fn owns(&self, session: &ClockSession) -> bool {
        session
            .owner_id
            .as_ref()
            .map_or(true, |owner| *owner == self.user_id)
    }

    fn upsert_session(&mut self, session: ClockSession) -> ClockSession {
        let history = &mut self.snapshot.session_history;
        match history.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => {
                existing.merge(session);
                existing.clone()
            }
            None => {
                history.insert(0, session.clone());
                session
            }
        }
    }

    pub(crate) fn apply_session_started(&mut self, session: ClockSession) {
        if !self.owns(&session) {
            tracing::debug!(session_id = %session.id, "Ignoring session owned by another user");
            return;
        }
        let merged = self.upsert_session(session);
        if !merged.is_active() {
            return;
        }
        let newer = match &self.snapshot.active_session {
            Some(current) if current.id != merged.id => merged.clock_in_at >= current.clock_in_at,
            _ => true,
        };
        // One ACTIVE session per owner: an older entry still marked active
        // lost its `session.ended`; the next snapshot restores it closed.
        let keep = if newer {
            Some(merged.id.clone())
        } else {
            self.snapshot.active_session.as_ref().map(|s| s.id.clone())
        };
        self.snapshot
            .session_history
            .retain(|s| !s.is_active() || Some(&s.id) == keep.as_ref());
        if !newer {
            return;
        }
        self.snapshot.active_session = Some(merged);
        self.snapshot.is_clocked_in = true;
    }

    pub(crate) fn apply_session_ended(&mut self, session: ClockSession) {
        if !self.owns(&session) {
            tracing::debug!(session_id = %session.id, "Ignoring session owned by another user");
            return;
        }
        let merged = self.upsert_session(session);
        let closes_active = self
            .snapshot
            .active_session
            .as_ref()
            .is_some_and(|active| active.id == merged.id);
        if closes_active {
            self.snapshot.active_session = None;
            self.snapshot.is_clocked_in = false;
            self.snapshot.active_break = None;
            // Break ids do not carry over into the next session.
            self.ended_breaks.clear();
            self.triggered_breaks.clear();
        }
    }

    fn upsert_break(&mut self, update: &BreakUpdate) -> Option<&ScheduledBreak> {
        let breaks = &mut self.snapshot.scheduled_breaks;
        if let Some(index) = breaks.iter().position(|b| b.id == update.id) {
            breaks[index].apply(update);
            return Some(&breaks[index]);
        }
        let entry = ScheduledBreak::from_update(update)?;
        breaks.push(entry);
        breaks.last()
    }

    /// Installs `update` as the active break. Returns the resulting state, or
    /// `None` when the break is already known to have ended.
    pub(crate) fn apply_break_started(&mut self, update: BreakUpdate) -> Option<ActiveBreakState> {
        let known_ended = self.ended_breaks.contains(&update.id)
            || self
                .snapshot
                .scheduled_break(update.id.as_str())
                .is_some_and(ScheduledBreak::has_ended);
        if known_ended {
            tracing::debug!(break_id = %update.id, "Ignoring start of a break that already ended");
            return None;
        }

        let break_type = self
            .upsert_break(&update)
            .map(|entry| entry.break_type)
            .or(update.break_type);
        let Some(break_type) = break_type else {
            tracing::warn!(break_id = %update.id, "Break start carries no break type; skipping");
            return None;
        };

        let active =
            ActiveBreakState::from_update(&update, break_type, self.snapshot.active_break.as_ref());
        self.snapshot.active_break = Some(active.clone());
        Some(active)
    }

    fn apply_break_ended(&mut self, mut update: BreakUpdate, now: DateTime<Utc>) {
        self.ended_breaks.insert(update.id.clone());
        update.actual_end.get_or_insert(now);

        let matches_active = self
            .snapshot
            .active_break
            .as_ref()
            .is_some_and(|active| active.id == update.id);
        if matches_active {
            if let Some(active) = self.snapshot.active_break.take() {
                update.break_type = update.break_type.or(Some(active.break_type));
                update.actual_start = update.actual_start.or(active.actual_start);
                update.away_reason = update.away_reason.or(active.away_reason);
            }
        }

        if self.upsert_break(&update).is_none() {
            tracing::debug!(break_id = %update.id, "Ended break unknown locally; not recorded");
        }
    }

    fn apply_break_pause_change(&mut self, update: BreakUpdate, paused: bool, now: DateTime<Utc>) {
        let Some(active) = self
            .snapshot
            .active_break
            .as_mut()
            .filter(|active| active.id == update.id)
        else {
            tracing::debug!(break_id = %update.id, paused, "Pause change for a break that is not active");
            return;
        };

        if paused {
            if !active.is_paused {
                active.paused_at = Some(now);
            }
            active.pause_used = true;
        } else if let Some(paused_at) = active.paused_at.take() {
            if update.paused_duration_seconds.is_none() {
                active.paused_duration_seconds += (now - paused_at).num_seconds().max(0);
            }
        }
        active.is_paused = paused;
        if let Some(duration) = update.paused_duration_seconds {
            active.paused_duration_seconds = duration;
        }
        if update.pause_used == Some(true) {
            active.pause_used = true;
        }
    }

    // ---- snapshots ------------------------------------------------------

    /// Replaces the cached view with an authoritative snapshot.
    ///
    /// Local runtime fields of the active break (pause state) survive when the
    /// store still reports the same break.
    pub(crate) fn replace_snapshot(&mut self, snapshot: StoreSnapshot) {
        let StoreSnapshot {
            status,
            history,
            scheduled_breaks,
        } = snapshot;
        let previous = self.snapshot.active_break.take();

        if let Some(history) = history {
            self.snapshot.session_history = history.entries;
            self.snapshot.stats = history.stats;
        }
        if let Some(breaks) = scheduled_breaks {
            // Ended entries in the new list are tombstones in their own right.
            self.ended_breaks.clear();
            self.snapshot.scheduled_breaks = breaks;
        }
        if !status.is_clocked_in {
            self.triggered_breaks.clear();
        }
        self.snapshot.work_schedule = status.work_schedules;
        self.snapshot.is_clocked_in = status.is_clocked_in;
        self.snapshot.active_session = status
            .active_entry
            .filter(|session| status.is_clocked_in && session.is_active());

        self.snapshot.active_break = match status.active_break {
            Some(update) if status.is_clocked_in => self.active_break_from_snapshot(&update, previous),
            _ => None,
        };
        if let Some(active) = &self.snapshot.active_break {
            self.ended_breaks.remove(&active.id);
        }
    }

    fn active_break_from_snapshot(
        &self,
        update: &BreakUpdate,
        previous: Option<ActiveBreakState>,
    ) -> Option<ActiveBreakState> {
        let break_type = update.break_type.or_else(|| {
            self.snapshot
                .scheduled_break(update.id.as_str())
                .map(|entry| entry.break_type)
        });
        let Some(break_type) = break_type else {
            tracing::warn!(break_id = %update.id, "Snapshot active break has no type; dropping it");
            return None;
        };

        let mut active = ActiveBreakState::from_update(update, break_type, None);
        if let Some(previous) = previous.filter(|p| p.id == active.id) {
            active.is_paused = previous.is_paused;
            active.paused_at = previous.paused_at;
            active.pause_used = previous.pause_used || active.pause_used;
            active.paused_duration_seconds = previous
                .paused_duration_seconds
                .max(active.paused_duration_seconds);
        }
        Some(active)
    }

    pub(crate) fn set_work_schedule(&mut self, schedule: Vec<WorkSchedule>) {
        self.snapshot.work_schedule = schedule;
    }

    /// Merges freshly read scheduled breaks by id without dropping entries the
    /// read does not know about yet.
    pub(crate) fn merge_scheduled_breaks(&mut self, breaks: Vec<ScheduledBreak>) {
        for entry in breaks {
            self.upsert_break(&BreakUpdate::from(entry));
        }
    }

    // ---- monitor --------------------------------------------------------

    /// Monitor calls required to bring the tracker in line with the active
    /// break. Each transition yields its calls exactly once.
    pub(crate) fn monitor_actions(&mut self) -> Vec<MonitorAction> {
        let active = self
            .snapshot
            .active_break
            .as_ref()
            .map(|b| (b.id.clone(), b.break_type));

        match (active, self.monitored_break.take()) {
            (Some((id, _)), Some(current)) if id == current => {
                self.monitored_break = Some(current);
                Vec::new()
            }
            (Some((id, break_type)), current) => {
                let mut actions = Vec::with_capacity(2);
                if current.is_some() {
                    actions.push(MonitorAction::Resume);
                }
                self.monitored_break = Some(id.clone());
                actions.push(MonitorAction::Pause(PauseRequest::for_break(id, break_type)));
                actions
            }
            (None, Some(_)) => vec![MonitorAction::Resume],
            (None, None) => Vec::new(),
        }
    }
}

/// Index of the open break with the latest start; ties go to the later entry.
fn most_recent_open_break(breaks: &[ScheduledBreak]) -> Option<usize> {
    breaks
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.is_active())
        .max_by_key(|(_, entry)| entry.actual_start)
        .map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{SessionStatus, WorkStats},
        store::{EntriesResponse, StatusResponse},
        types::SessionId,
    };
    use chrono::TimeZone;

    const WINDOW: Duration = Duration::from_millis(1000);

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, hour, minute, 0).unwrap()
    }

    fn session(id: &str, owner: &str, clock_in: DateTime<Utc>) -> ClockSession {
        ClockSession {
            id: SessionId::new(id),
            owner_id: Some(UserId::new(owner)),
            clock_in_at: clock_in,
            clock_out_at: None,
            status: SessionStatus::Active,
        }
    }

    fn closed(mut session: ClockSession, clock_out: DateTime<Utc>) -> ClockSession {
        session.clock_out_at = Some(clock_out);
        session.status = SessionStatus::Closed;
        session
    }

    fn started(id: &str, break_type: BreakType, start: DateTime<Utc>) -> BreakUpdate {
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

    fn ended(id: &str, end: DateTime<Utc>) -> BreakUpdate {
        BreakUpdate {
            id: BreakId::new(id),
            actual_end: Some(end),
            ..Default::default()
        }
    }

    fn clocked_in_state() -> (EngineState, Instant) {
        let mut state = EngineState::new(UserId::new("u1"), WINDOW);
        let now = Instant::now();
        state.apply_event(
            SyncEvent::SessionStarted(session("s1", "u1", at(9, 0))),
            now,
            at(9, 0),
        );
        (state, now)
    }

    #[test]
    fn break_started_twice_equals_once() {
        let (mut state, now) = clocked_in_state();
        let event = SyncEvent::BreakStarted(started("b1", BreakType::Lunch, at(12, 0)));

        state.apply_event(event.clone(), now, at(12, 0));
        let once = state.snapshot().clone();
        state.apply_event(event, now, at(12, 0));

        assert_eq!(state.snapshot(), &once);
        assert_eq!(state.snapshot().scheduled_breaks.len(), 1);
        assert_eq!(state.snapshot().active_break.as_ref().unwrap().id, "b1");
    }

    #[test]
    fn break_started_after_break_ended_does_not_resurrect() {
        let (mut state, now) = clocked_in_state();
        state.apply_event(
            SyncEvent::BreakStarted(started("b1", BreakType::Morning, at(10, 0))),
            now,
            at(10, 0),
        );
        state.apply_event(SyncEvent::BreakEnded(ended("b1", at(10, 15))), now, at(10, 15));
        state.apply_event(
            SyncEvent::BreakStarted(started("b1", BreakType::Morning, at(10, 0))),
            now,
            at(10, 16),
        );

        assert!(state.snapshot().active_break.is_none());
        let entry = state.snapshot().scheduled_break("b1").unwrap();
        assert_eq!(entry.actual_end, Some(at(10, 15)));
    }

    #[test]
    fn break_ended_for_unseen_break_borrows_start_from_active_break() {
        let (mut state, now) = clocked_in_state();
        state.snapshot.active_break = Some(ActiveBreakState::from_update(
            &started("b7", BreakType::Afternoon, at(15, 0)),
            BreakType::Afternoon,
            None,
        ));

        state.apply_event(SyncEvent::BreakEnded(ended("b7", at(15, 15))), now, at(15, 15));

        let entry = state.snapshot().scheduled_break("b7").unwrap();
        assert_eq!(entry.actual_start, Some(at(15, 0)));
        assert_eq!(entry.actual_end, Some(at(15, 15)));
        assert_eq!(entry.break_type, BreakType::Afternoon);
    }

    #[test]
    fn trigger_for_other_user_leaves_state_untouched() {
        let (mut state, _) = clocked_in_state();
        let before = state.snapshot().clone();
        let later = Instant::now() + Duration::from_secs(5);

        let outcome = state.apply_event(
            SyncEvent::AutoStartTrigger(AutoStartTrigger {
                break_id: BreakId::new("b1"),
                break_type: BreakType::Morning,
                staff_user_id: UserId::new("someone-else"),
            }),
            later,
            at(10, 0),
        );

        assert_eq!(outcome, EventOutcome::Ignored);
        assert_eq!(state.snapshot(), &before);
        assert!(state.triggered_breaks.is_empty());
        assert!(!state.is_suppressed(later));
    }

    #[test]
    fn trigger_for_this_user_requests_start_once() {
        let (mut state, now) = clocked_in_state();
        let trigger = SyncEvent::AutoStartTrigger(AutoStartTrigger {
            break_id: BreakId::new("b2"),
            break_type: BreakType::Afternoon,
            staff_user_id: UserId::new("u1"),
        });

        assert_eq!(
            state.apply_event(trigger.clone(), now, at(15, 0)),
            EventOutcome::StartBreak(BreakType::Afternoon)
        );
        assert_eq!(
            state.apply_event(trigger, now, at(15, 0)),
            EventOutcome::Ignored
        );
    }

    #[test]
    fn trigger_refused_while_command_in_flight_can_fire_later() {
        let (mut state, now) = clocked_in_state();
        let trigger = SyncEvent::AutoStartTrigger(AutoStartTrigger {
            break_id: BreakId::new("b3"),
            break_type: BreakType::Morning,
            staff_user_id: UserId::new("u1"),
        });
        state.begin_break_command(BreakCommand::Start).unwrap();

        assert_eq!(
            state.apply_event(trigger.clone(), now, at(10, 0)),
            EventOutcome::Ignored
        );
        assert!(state.triggered_breaks.is_empty());

        state.finish_break_command();
        assert_eq!(
            state.apply_event(trigger, now, at(10, 1)),
            EventOutcome::StartBreak(BreakType::Morning)
        );
    }

    #[test]
    fn clock_out_forgets_break_bookkeeping() {
        let (mut state, now) = clocked_in_state();
        state.apply_event(
            SyncEvent::AutoStartTrigger(AutoStartTrigger {
                break_id: BreakId::new("b1"),
                break_type: BreakType::Morning,
                staff_user_id: UserId::new("u1"),
            }),
            now,
            at(10, 0),
        );
        state.apply_event(
            SyncEvent::BreakStarted(started("b1", BreakType::Morning, at(10, 0))),
            now,
            at(10, 0),
        );
        state.apply_event(SyncEvent::BreakEnded(ended("b1", at(10, 15))), now, at(10, 15));
        assert!(!state.ended_breaks.is_empty());
        assert!(!state.triggered_breaks.is_empty());

        state.apply_event(
            SyncEvent::SessionEnded(closed(session("s1", "u1", at(9, 0)), at(17, 0))),
            now,
            at(17, 0),
        );

        assert!(state.ended_breaks.is_empty());
        assert!(state.triggered_breaks.is_empty());
        // The scheduled list still remembers that b1 ended.
        assert!(state
            .apply_break_started(started("b1", BreakType::Morning, at(10, 0)))
            .is_none());
    }

    #[test]
    fn snapshot_break_list_replaces_tombstones() {
        let (mut state, now) = clocked_in_state();
        state.apply_event(SyncEvent::BreakEnded(ended("gone", at(10, 15))), now, at(10, 15));
        assert!(state.ended_breaks.contains(&BreakId::new("gone")));

        state.replace_snapshot(StoreSnapshot {
            status: StatusResponse {
                is_clocked_in: true,
                active_entry: Some(session("s1", "u1", at(9, 0))),
                active_break: None,
                work_schedules: Vec::new(),
            },
            history: None,
            scheduled_breaks: Some(Vec::new()),
        });

        assert!(state.ended_breaks.is_empty());
    }

    #[test]
    fn suppression_window_expires() {
        let (state, now) = clocked_in_state();
        assert!(state.is_suppressed(now + Duration::from_millis(999)));
        assert!(!state.is_suppressed(now + Duration::from_millis(1000)));
    }

    #[test]
    fn session_redelivery_after_end_keeps_clocked_out() {
        let (mut state, now) = clocked_in_state();
        let s1 = session("s1", "u1", at(9, 0));
        state.apply_event(SyncEvent::SessionEnded(closed(s1.clone(), at(17, 0))), now, at(17, 0));
        state.apply_event(SyncEvent::SessionStarted(s1), now, at(17, 1));

        assert!(!state.snapshot().is_clocked_in);
        assert!(state.snapshot().active_session.is_none());
        assert_eq!(state.snapshot().session_history.len(), 1);
        assert!(!state.snapshot().session_history[0].is_active());
    }

    #[test]
    fn newer_session_replaces_stale_active_entry() {
        let (mut state, now) = clocked_in_state();
        state.apply_event(
            SyncEvent::SessionStarted(session("s2", "u1", at(13, 0))),
            now,
            at(13, 0),
        );
        // A late start for the older session must not take over.
        state.apply_event(
            SyncEvent::SessionStarted(session("s1", "u1", at(9, 0))),
            now,
            at(13, 1),
        );

        let snapshot = state.snapshot();
        assert_eq!(snapshot.active_session.as_ref().unwrap().id, "s2");
        let active: Vec<_> = snapshot
            .session_history
            .iter()
            .filter(|s| s.is_active())
            .collect();
        assert_eq!(active.len(), 1);
    }

    #[test]
    fn sessions_of_other_owners_are_ignored() {
        let mut state = EngineState::new(UserId::new("u1"), WINDOW);
        state.apply_event(
            SyncEvent::SessionStarted(session("s9", "u2", at(9, 0))),
            Instant::now(),
            at(9, 0),
        );
        assert!(!state.snapshot().is_clocked_in);
        assert!(state.snapshot().session_history.is_empty());
    }

    #[test]
    fn end_result_falls_back_to_most_recent_open_break() {
        let (mut state, _) = clocked_in_state();
        state.snapshot.scheduled_breaks = vec![
            ScheduledBreak::from_update(&started("b0", BreakType::Morning, at(10, 0))).unwrap(),
            ScheduledBreak::from_update(&started("b1", BreakType::Lunch, at(12, 0))).unwrap(),
            ScheduledBreak::from_update(&BreakUpdate {
                id: BreakId::new("b2"),
                break_type: Some(BreakType::Afternoon),
                ..Default::default()
            })
            .unwrap(),
        ];
        state.snapshot.scheduled_breaks[0].actual_end = Some(at(10, 15));

        let closed = state
            .apply_break_end_result(&BreakId::new("b-unknown"), ended("b-unknown", at(13, 0)), at(13, 0))
            .unwrap();

        assert_eq!(closed.id, "b1");
        assert_eq!(closed.actual_end, Some(at(13, 0)));
        assert_eq!(state.snapshot().scheduled_break("b0").unwrap().actual_end, Some(at(10, 15)));
        assert!(state.snapshot().scheduled_break("b2").unwrap().actual_start.is_none());
    }

    #[test]
    fn most_recent_open_break_prefers_later_start_then_later_position() {
        let a = ScheduledBreak::from_update(&started("a", BreakType::Morning, at(10, 0))).unwrap();
        let b = ScheduledBreak::from_update(&started("b", BreakType::Lunch, at(12, 0))).unwrap();
        let c = ScheduledBreak::from_update(&started("c", BreakType::Away, at(12, 0))).unwrap();
        assert_eq!(most_recent_open_break(&[a.clone(), b.clone()]), Some(1));
        assert_eq!(most_recent_open_break(&[b.clone(), a.clone()]), Some(0));
        assert_eq!(most_recent_open_break(&[a, b, c]), Some(2));
        assert_eq!(most_recent_open_break(&[]), None);
    }

    #[test]
    fn start_precondition_rejects_when_break_active() {
        let (mut state, now) = clocked_in_state();
        state.apply_event(
            SyncEvent::BreakStarted(started("b1", BreakType::Morning, at(10, 0))),
            now,
            at(10, 0),
        );
        assert_eq!(
            state.begin_break_command(BreakCommand::Start),
            Err(EngineError::BreakAlreadyActive)
        );
        state.begin_break_command(BreakCommand::End).unwrap();
        assert_eq!(
            state.begin_break_command(BreakCommand::End),
            Err(EngineError::CommandInFlight)
        );
        state.finish_break_command();
        state.begin_break_command(BreakCommand::End).unwrap();
    }

    #[test]
    fn start_precondition_requires_clock_in() {
        let mut state = EngineState::new(UserId::new("u1"), WINDOW);
        assert_eq!(
            state.begin_break_command(BreakCommand::Start),
            Err(EngineError::NotClockedIn)
        );
        assert_eq!(
            state.begin_break_command(BreakCommand::End),
            Err(EngineError::NoActiveBreak)
        );
    }

    #[test]
    fn monitor_actions_fire_once_per_transition() {
        let (mut state, now) = clocked_in_state();
        assert!(state.monitor_actions().is_empty());

        let event = SyncEvent::BreakStarted(started("b1", BreakType::Lunch, at(12, 0)));
        state.apply_event(event.clone(), now, at(12, 0));
        assert_eq!(
            state.monitor_actions(),
            vec![MonitorAction::Pause(PauseRequest::for_break(
                BreakId::new("b1"),
                BreakType::Lunch
            ))]
        );
        state.apply_event(event, now, at(12, 0));
        assert!(state.monitor_actions().is_empty());

        state.apply_event(SyncEvent::BreakEnded(ended("b1", at(13, 0))), now, at(13, 0));
        assert_eq!(state.monitor_actions(), vec![MonitorAction::Resume]);
        assert!(state.monitor_actions().is_empty());
    }

    #[test]
    fn remote_pause_and_resume_patch_active_break() {
        let (mut state, now) = clocked_in_state();
        state.apply_event(
            SyncEvent::BreakStarted(started("b1", BreakType::Lunch, at(12, 0))),
            now,
            at(12, 0),
        );
        state.apply_event(
            SyncEvent::BreakPaused(BreakUpdate {
                id: BreakId::new("b1"),
                paused_duration_seconds: Some(0),
                ..Default::default()
            }),
            now,
            at(12, 10),
        );
        let active = state.snapshot().active_break.clone().unwrap();
        assert!(active.is_paused);
        assert!(active.pause_used);

        state.apply_event(
            SyncEvent::BreakResumed(BreakUpdate {
                id: BreakId::new("b1"),
                paused_duration_seconds: Some(300),
                ..Default::default()
            }),
            now,
            at(12, 15),
        );
        let active = state.snapshot().active_break.clone().unwrap();
        assert!(!active.is_paused);
        assert_eq!(active.paused_duration_seconds, 300);
        assert!(matches!(
            state.pause_active_break(at(12, 20)),
            Err(EngineError::PauseAlreadyUsed)
        ));
    }

    #[test]
    fn snapshot_keeps_local_pause_for_same_break() {
        let (mut state, now) = clocked_in_state();
        state.apply_event(
            SyncEvent::BreakStarted(started("b1", BreakType::Lunch, at(12, 0))),
            now,
            at(12, 0),
        );
        state.pause_active_break(at(12, 5)).unwrap();

        state.replace_snapshot(StoreSnapshot {
            status: StatusResponse {
                is_clocked_in: true,
                active_entry: Some(session("s1", "u1", at(9, 0))),
                active_break: Some(started("b1", BreakType::Lunch, at(12, 0))),
                work_schedules: Vec::new(),
            },
            history: Some(EntriesResponse {
                entries: vec![session("s1", "u1", at(9, 0))],
                stats: WorkStats {
                    today: 3.0,
                    week: 20.5,
                    month: 80.0,
                },
            }),
            scheduled_breaks: None,
        });

        let active = state.snapshot().active_break.clone().unwrap();
        assert!(active.is_paused);
        assert_eq!(active.paused_at, Some(at(12, 5)));
        assert_eq!(state.snapshot().stats.week, 20.5);
        // The scheduled list was not part of the snapshot and stays as it was.
        assert!(state.snapshot().scheduled_break("b1").is_some());
    }

    #[test]
    fn clocked_out_snapshot_clears_active_break() {
        let (mut state, now) = clocked_in_state();
        state.apply_event(
            SyncEvent::BreakStarted(started("b1", BreakType::Lunch, at(12, 0))),
            now,
            at(12, 0),
        );
        state.replace_snapshot(StoreSnapshot {
            status: StatusResponse {
                is_clocked_in: false,
                active_entry: None,
                active_break: Some(started("b1", BreakType::Lunch, at(12, 0))),
                work_schedules: Vec::new(),
            },
            history: None,
            scheduled_breaks: Some(Vec::new()),
        });
        assert!(!state.snapshot().is_clocked_in);
        assert!(state.snapshot().active_break.is_none());
        assert!(state.snapshot().active_session.is_none());
    }
}
