use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Recurring shift template entry. Read-only for the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkSchedule {
    pub id: String,
    /// 0 = Sunday .. 6 = Saturday.
    #[serde(alias = "day_of_week")]
    pub day_of_week: u8,
    #[serde(alias = "shift_start", alias = "startTime", alias = "start_time")]
    pub shift_start: NaiveTime,
    #[serde(alias = "shift_end", alias = "endTime", alias = "end_time")]
    pub shift_end: NaiveTime,
    #[serde(default = "default_active", alias = "is_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}
