use thiserror::Error;

/// Failures talking to the session store.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// The store could not be reached. Transport-level retry is the caller's
    /// business; the engine never retries a command.
    #[error("session store unreachable: {0}")]
    Connectivity(String),
    /// The store answered with a non-success status, e.g. a double clock-in.
    #[error("session store rejected the command ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("failed to decode session store response: {0}")]
    Decode(String),
}

/// Errors returned by engine commands.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("not clocked in")]
    NotClockedIn,
    #[error("a break is already active")]
    BreakAlreadyActive,
    #[error("no break is active")]
    NoActiveBreak,
    #[error("another break command is still in flight")]
    CommandInFlight,
    #[error("the break is already paused")]
    AlreadyPaused,
    #[error("the break is not paused")]
    NotPaused,
    #[error("this break has already used its pause")]
    PauseAlreadyUsed,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl EngineError {
    /// `true` when the command was refused locally, before reaching the store.
    pub fn is_local(&self) -> bool {
        !matches!(self, EngineError::Store(_))
    }
}
