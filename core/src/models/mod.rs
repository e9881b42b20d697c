//! Canonical in-memory shapes for sessions, breaks and the engine snapshot.
//!
//! Wire payloads are normalized into these types at deserialization time, so
//! nothing downstream has to care about snake_case or lowercased field names.

pub mod breaks;
pub mod schedule;
pub mod session;
pub mod snapshot;

pub use breaks::{ActiveBreakState, BreakType, BreakUpdate, ScheduledBreak};
pub use schedule::WorkSchedule;
pub use session::{ClockSession, SessionStatus};
pub use snapshot::{EngineSnapshot, WorkStats};
