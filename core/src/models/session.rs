//! Clock sessions: one continuous work period bounded by clock-in/clock-out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{SessionId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    #[serde(alias = "active")]
    Active,
    #[serde(alias = "closed", alias = "COMPLETED", alias = "completed")]
    Closed,
}

/// A worker's clock session as cached by the engine.
///
/// `clock_out_at` is set exactly when `status` is [`SessionStatus::Closed`];
/// deserialization derives the status from the timestamps when the payload
/// omits it or contradicts it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawClockSession")]
pub struct ClockSession {
    pub id: SessionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserId>,
    pub clock_in_at: DateTime<Utc>,
    pub clock_out_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClockSession {
    id: SessionId,
    #[serde(
        default,
        alias = "owner_id",
        alias = "staffUserId",
        alias = "staff_user_id",
        alias = "userId",
        alias = "user_id"
    )]
    owner_id: Option<UserId>,
    #[serde(alias = "clock_in_at", alias = "clockIn", alias = "clock_in")]
    clock_in_at: DateTime<Utc>,
    #[serde(default, alias = "clock_out_at", alias = "clockOut", alias = "clock_out")]
    clock_out_at: Option<DateTime<Utc>>,
    #[serde(default)]
    status: Option<SessionStatus>,
}

impl From<RawClockSession> for ClockSession {
    fn from(raw: RawClockSession) -> Self {
        let status = match (raw.clock_out_at, raw.status) {
            (Some(_), _) => SessionStatus::Closed,
            (None, Some(status)) => status,
            (None, None) => SessionStatus::Active,
        };
        Self {
            id: raw.id,
            owner_id: raw.owner_id,
            clock_in_at: raw.clock_in_at,
            clock_out_at: raw.clock_out_at,
            status,
        }
    }
}

impl ClockSession {
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Replaces this session with a fresher copy of the same entity.
    ///
    /// Closing is terminal: an ACTIVE copy never reopens a CLOSED session, which
    /// keeps a late redelivery of `session.started` from undoing a clock-out.
    pub fn merge(&mut self, incoming: ClockSession) {
        if self.status == SessionStatus::Closed && incoming.status == SessionStatus::Active {
            return;
        }
        let owner_id = incoming.owner_id.or_else(|| self.owner_id.take());
        *self = ClockSession {
            owner_id,
            ..incoming
        };
    }
}
