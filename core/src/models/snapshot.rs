use serde::{Deserialize, Serialize};

use super::{ActiveBreakState, ClockSession, ScheduledBreak, WorkSchedule};

/// Worked hours for the current day, week and month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkStats {
    #[serde(default)]
    pub today: f64,
    #[serde(default)]
    pub week: f64,
    #[serde(default)]
    pub month: f64,
}

/// The aggregate the presentation layer observes. Only the engine mutates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    pub is_clocked_in: bool,
    pub active_session: Option<ClockSession>,
    /// Most recent first.
    pub session_history: Vec<ClockSession>,
    pub scheduled_breaks: Vec<ScheduledBreak>,
    pub active_break: Option<ActiveBreakState>,
    pub work_schedule: Vec<WorkSchedule>,
    pub stats: WorkStats,
}

impl EngineSnapshot {
    pub fn scheduled_break(&self, id: &str) -> Option<&ScheduledBreak> {
        self.scheduled_breaks.iter().find(|b| b.id == id)
    }
}
