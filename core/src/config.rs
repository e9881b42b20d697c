use std::time::Duration;

use crate::types::UserId;

/// Quiescence period after an applied event during which snapshot pulls are
/// discarded.
pub const DEFAULT_SUPPRESSION_WINDOW: Duration = Duration::from_millis(1000);

/// Longest a single activity monitor call may take before it is abandoned.
pub const DEFAULT_MONITOR_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// The staff user this engine acts for. Auto-start triggers addressed to
    /// anyone else are ignored.
    pub user_id: UserId,
    pub suppression_window: Duration,
    pub monitor_timeout: Duration,
}

impl EngineConfig {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            suppression_window: DEFAULT_SUPPRESSION_WINDOW,
            monitor_timeout: DEFAULT_MONITOR_TIMEOUT,
        }
    }

    pub fn with_suppression_window(mut self, window: Duration) -> Self {
        self.suppression_window = window;
        self
    }

    pub fn with_monitor_timeout(mut self, timeout: Duration) -> Self {
        self.monitor_timeout = timeout;
        self
    }
}
