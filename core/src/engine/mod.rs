//! The sync engine: the single writer of the cached [`EngineSnapshot`].
//!
//! Commands go to the session store first and are applied locally once the
//! store accepts them. Pushed events are applied as they arrive. Snapshot
//! pulls replace the cache unless an event or command result landed within
//! the suppression window. Every change to the active break is mirrored to the
//! activity monitor exactly once.
//!
//! State lives behind a `std::sync::Mutex` that is never held across an
//! `.await`; observers read through a `watch` channel instead.

mod state;

use chrono::Utc;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::{
    sync::{broadcast, watch, OwnedMutexGuard},
    time::{Duration, Instant},
};

use crate::{
    config::EngineConfig,
    error::{EngineError, StoreError},
    events::{EventError, SyncEvent},
    models::{ActiveBreakState, BreakType, ClockSession, EngineSnapshot, ScheduledBreak},
    monitor::{ActivityMonitor, MonitorError},
    store::{ClockOutRequest, EndBreakRequest, SessionStore, StartBreakRequest, StoreSnapshot},
    types::{BreakId, UserId},
};

pub use state::EventOutcome;
use state::{BreakCommand, EngineState, MonitorAction};

const NOTICE_CAPACITY: usize = 16;

/// Failures the engine reports asynchronously, for commands whose callers do
/// not wait on the outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EngineNotice {
    #[serde(rename_all = "camelCase")]
    ClockOutFailed { error: String },
    #[serde(rename_all = "camelCase")]
    AutoStartFailed { break_type: BreakType, error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotOutcome {
    Applied,
    /// Discarded because the cache was updated within the suppression window.
    Suppressed,
}

/// A result that exists only in this process and was not persisted to the
/// session store.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalOnly<T>(pub T);

impl<T> LocalOnly<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

pub struct SyncEngine {
    store: Arc<dyn SessionStore>,
    monitor: Arc<dyn ActivityMonitor>,
    monitor_timeout: Duration,
    state: Mutex<EngineState>,
    /// Serializes transitions with their monitor calls so pause/resume reach
    /// the monitor in the order the transitions happened.
    transitions: Arc<tokio::sync::Mutex<()>>,
    snapshot_tx: watch::Sender<EngineSnapshot>,
    notice_tx: broadcast::Sender<EngineNotice>,
}

impl SyncEngine {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn SessionStore>,
        monitor: Arc<dyn ActivityMonitor>,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(EngineSnapshot::default());
        let (notice_tx, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            store,
            monitor,
            monitor_timeout: config.monitor_timeout,
            state: Mutex::new(EngineState::new(config.user_id, config.suppression_window)),
            transitions: Arc::new(tokio::sync::Mutex::new(())),
            snapshot_tx,
            notice_tx,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.lock().user_id().clone()
    }

    /// Current cached state.
    pub fn snapshot(&self) -> EngineSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Receives every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<EngineSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn notices(&self) -> broadcast::Receiver<EngineNotice> {
        self.notice_tx.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, notice: EngineNotice) {
        // No subscribers is fine; the failure has been logged already.
        let _ = self.notice_tx.send(notice);
    }

    /// Applies `f` to the state, publishes the result and performs the monitor
    /// calls the transition requires.
    ///
    /// The monitor calls run on their own task, which keeps the transition
    /// lock until they are done. Dropping the returned future therefore never
    /// loses or reorders a pause/resume.
    async fn commit<R>(&self, f: impl FnOnce(&mut EngineState) -> R) -> R {
        let transition = Arc::clone(&self.transitions).lock_owned().await;
        let (result, actions) = {
            let mut state = self.lock();
            let result = f(&mut state);
            let actions = state.monitor_actions();
            self.snapshot_tx.send_replace(state.snapshot().clone());
            (result, actions)
        };
        if !actions.is_empty() {
            let calls = drive_monitor(
                Arc::clone(&self.monitor),
                self.monitor_timeout,
                actions,
                transition,
            );
            if let Err(err) = tokio::spawn(calls).await {
                tracing::error!(error = %err, "Activity monitor task failed");
            }
        }
        result
    }

    // ---- commands -------------------------------------------------------

    /// Opens a new clock session. A store rejection (e.g. already clocked in
    /// elsewhere) is returned unchanged.
    pub async fn clock_in(&self) -> Result<ClockSession, EngineError> {
        let session = self.store.clock_in().await?;
        tracing::info!(session_id = %session.id, "Clocked in");

        let applied = session.clone();
        self.commit(move |state| {
            state.mark_fresh(Instant::now());
            state.apply_session_started(applied);
        })
        .await;
        self.refresh_schedule().await;
        Ok(session)
    }

    /// Re-reads the work schedule and the scheduled breaks after a clock-in.
    /// Failures are logged; the session itself is already open.
    async fn refresh_schedule(&self) {
        let (status, breaks) = tokio::join!(self.store.status(), self.store.scheduled_breaks());
        self.commit(move |state| {
            match status {
                Ok(status) => state.set_work_schedule(status.work_schedules),
                Err(err) => tracing::warn!(error = %err, "Failed to refresh work schedule"),
            }
            match breaks {
                Ok(breaks) => state.merge_scheduled_breaks(breaks),
                Err(err) => tracing::warn!(error = %err, "Failed to refresh scheduled breaks"),
            }
        })
        .await;
    }

    /// Closes the active session.
    ///
    /// Callers do not wait on this; failures are logged and published as
    /// [`EngineNotice::ClockOutFailed`].
    pub async fn clock_out(&self, request: ClockOutRequest) -> Option<ClockSession> {
        match self.store.clock_out(request).await {
            Ok(session) => {
                tracing::info!(session_id = %session.id, "Clocked out");
                let applied = session.clone();
                self.commit(move |state| {
                    state.mark_fresh(Instant::now());
                    state.apply_session_ended(applied);
                })
                .await;
                Some(session)
            }
            Err(err) => {
                tracing::error!(error = %err, "Clock-out failed");
                self.notify(EngineNotice::ClockOutFailed {
                    error: err.to_string(),
                });
                None
            }
        }
    }

    pub async fn start_break(
        &self,
        break_type: BreakType,
        away_reason: Option<String>,
    ) -> Result<ActiveBreakState, EngineError> {
        let away_reason = away_reason
            .map(|reason| reason.trim().to_owned())
            .filter(|reason| !reason.is_empty());
        match (break_type.requires_away_reason(), &away_reason) {
            (true, None) => {
                return Err(EngineError::InvalidRequest(
                    "AWAY breaks require a reason".into(),
                ))
            }
            (false, Some(_)) => {
                return Err(EngineError::InvalidRequest(format!(
                    "{break_type} breaks do not take an away reason"
                )))
            }
            _ => {}
        }

        let command = self.begin_break_command(BreakCommand::Start)?;
        let request = StartBreakRequest {
            break_type,
            away_reason: away_reason.clone(),
        };
        let mut update = match self.store.start_break(request).await {
            Ok(update) => update,
            Err(err) => return Err(abort_break_command(command, err)),
        };

        update.break_type.get_or_insert(break_type);
        update.actual_start.get_or_insert_with(Utc::now);
        if update.away_reason.is_none() {
            update.away_reason = away_reason;
        }
        tracing::info!(break_id = %update.id, %break_type, "Break started");

        let fallback = ActiveBreakState::from_update(&update, break_type, None);
        let active = self
            .commit(move |state| {
                command.complete(state);
                state.mark_fresh(Instant::now());
                state.apply_break_started(update)
            })
            .await;
        // `None` means a `break.ended` for this break overtook the response.
        Ok(active.unwrap_or(fallback))
    }

    /// Ends the active break. Returns the scheduled entry that was closed, if
    /// any.
    pub async fn end_break(&self, break_id: BreakId) -> Result<Option<ScheduledBreak>, EngineError> {
        let command = self.begin_break_command(BreakCommand::End)?;
        let request = EndBreakRequest {
            break_id: break_id.clone(),
        };
        let update = match self.store.end_break(request).await {
            Ok(update) => update,
            Err(err) => return Err(abort_break_command(command, err)),
        };
        tracing::info!(break_id = %break_id, "Break ended");

        let closed = self
            .commit(move |state| {
                command.complete(state);
                state.mark_fresh(Instant::now());
                state.apply_break_end_result(&break_id, update, Utc::now())
            })
            .await;
        Ok(closed)
    }

    fn begin_break_command(&self, command: BreakCommand) -> Result<InFlight<'_>, EngineError> {
        self.lock().begin_break_command(command)?;
        Ok(InFlight {
            state: &self.state,
            armed: true,
        })
    }

    /// Pauses the active break. The store has no pause endpoint, so this only
    /// changes local state.
    pub async fn pause_break(&self) -> Result<LocalOnly<ActiveBreakState>, EngineError> {
        let active = self
            .commit(|state| state.pause_active_break(Utc::now()))
            .await?;
        tracing::info!(break_id = %active.id, "Break paused locally");
        Ok(LocalOnly(active))
    }

    pub async fn resume_break(&self) -> Result<LocalOnly<ActiveBreakState>, EngineError> {
        let active = self
            .commit(|state| state.resume_active_break(Utc::now()))
            .await?;
        tracing::info!(
            break_id = %active.id,
            paused_seconds = active.paused_duration_seconds,
            "Break resumed locally"
        );
        Ok(LocalOnly(active))
    }

    // ---- events and snapshots ------------------------------------------

    /// Applies a pushed event. An auto-start trigger for this user starts the
    /// break here; its failure is published as [`EngineNotice::AutoStartFailed`].
    pub async fn apply_event(&self, event: SyncEvent) -> EventOutcome {
        let kind = event.kind();
        let outcome = self
            .commit(move |state| state.apply_event(event, Instant::now(), Utc::now()))
            .await;
        tracing::debug!(kind, ?outcome, "Event processed");

        if let EventOutcome::StartBreak(break_type) = outcome {
            tracing::info!(%break_type, "Auto-starting break");
            if let Err(err) = self.start_break(break_type, None).await {
                tracing::warn!(%break_type, error = %err, "Auto-start failed");
                self.notify(EngineNotice::AutoStartFailed {
                    break_type,
                    error: err.to_string(),
                });
            }
        }
        outcome
    }

    /// Parses and applies one raw event frame. Unknown event types yield
    /// `Ok(None)`.
    pub async fn ingest(&self, frame: &str) -> Result<Option<EventOutcome>, EventError> {
        match SyncEvent::parse(frame)? {
            Some(event) => Ok(Some(self.apply_event(event).await)),
            None => {
                tracing::debug!("Ignoring event of unknown type");
                Ok(None)
            }
        }
    }

    /// Pulls the full state from the store and replaces the cache with it,
    /// unless the cache was updated within the suppression window.
    pub async fn refresh_snapshot(&self) -> Result<SnapshotOutcome, EngineError> {
        let (status, history, breaks) = tokio::try_join!(
            self.store.status(),
            self.store.entries(),
            self.store.scheduled_breaks()
        )?;
        let snapshot = StoreSnapshot {
            status,
            history: Some(history),
            scheduled_breaks: Some(breaks),
        };

        let outcome = self
            .commit(move |state| {
                if state.is_suppressed(Instant::now()) {
                    return SnapshotOutcome::Suppressed;
                }
                state.replace_snapshot(snapshot);
                SnapshotOutcome::Applied
            })
            .await;
        tracing::debug!(?outcome, "Snapshot refresh");
        Ok(outcome)
    }
}

/// Marks a break command in flight. Releases the mark when dropped, so a
/// caller that gives up on the command does not block the next one.
struct InFlight<'a> {
    state: &'a Mutex<EngineState>,
    armed: bool,
}

impl InFlight<'_> {
    /// Releases the mark as part of the commit that applies the result.
    fn complete(mut self, state: &mut EngineState) {
        state.finish_break_command();
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .finish_break_command();
        }
    }
}

fn abort_break_command(command: InFlight<'_>, err: StoreError) -> EngineError {
    drop(command);
    tracing::warn!(error = %err, "Break command rejected by session store");
    err.into()
}

async fn drive_monitor(
    monitor: Arc<dyn ActivityMonitor>,
    timeout: Duration,
    actions: Vec<MonitorAction>,
    _transition: OwnedMutexGuard<()>,
) {
    for action in actions {
        let call = async {
            match &action {
                MonitorAction::Pause(request) => monitor.pause(request).await,
                MonitorAction::Resume => monitor.resume().await,
            }
        };
        let result = tokio::time::timeout(timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(MonitorError::Failed(format!(
                    "no answer within {}ms",
                    timeout.as_millis()
                )))
            });
        match result {
            Ok(()) => tracing::debug!(?action, "Activity monitor updated"),
            Err(MonitorError::Unavailable) => {
                tracing::debug!(?action, "No activity monitor in this runtime")
            }
            Err(err) => tracing::warn!(?action, error = %err, "Activity monitor call failed"),
        }
    }
}
