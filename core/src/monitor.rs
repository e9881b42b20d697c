//! Activity monitor seam: the local device process that tracks input and
//! screen activity. The engine is its only caller and invokes it only on
//! break transitions.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::{models::BreakType, types::BreakId};

/// Arguments of a `pause` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseRequest {
    #[serde(rename = "type")]
    pub break_type: BreakType,
    pub duration_minutes: u32,
    pub break_id: BreakId,
}

impl PauseRequest {
    pub fn for_break(break_id: BreakId, break_type: BreakType) -> Self {
        Self {
            break_type,
            duration_minutes: break_type.monitor_duration_minutes(),
            break_id,
        }
    }
}

#[derive(Debug, Error)]
pub enum MonitorError {
    /// No monitor exists in this runtime (e.g. not a desktop). Not an error
    /// condition for the engine; the call is skipped.
    #[error("activity monitor is not available in this runtime")]
    Unavailable,
    #[error("activity monitor call failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait ActivityMonitor: Send + Sync {
    async fn pause(&self, request: &PauseRequest) -> Result<(), MonitorError>;
    async fn resume(&self) -> Result<(), MonitorError>;
}

/// Monitor for runtimes without a local tracker.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMonitor;

#[async_trait]
impl ActivityMonitor for NoopMonitor {
    async fn pause(&self, _request: &PauseRequest) -> Result<(), MonitorError> {
        Err(MonitorError::Unavailable)
    }

    async fn resume(&self) -> Result<(), MonitorError> {
        Err(MonitorError::Unavailable)
    }
}
