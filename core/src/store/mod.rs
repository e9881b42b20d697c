//! Session store seam.
//!
//! The store persists sessions and breaks behind REST endpoints and is
//! expected to broadcast every mutation on the event channel. [`ApiClient`] is
//! the reqwest-backed implementation; tests substitute `MockSessionStore`.

mod client;
pub mod types;

use async_trait::async_trait;

use crate::{
    error::StoreError,
    models::{BreakUpdate, ClockSession, ScheduledBreak},
};

pub use client::ApiClient;
pub use types::{
    ClockOutRequest, EndBreakRequest, EntriesResponse, StartBreakRequest, StatusResponse,
    StoreSnapshot,
};

/// REST surface of the session store.
///
/// This trait is designed to be mockable using mockall for testing.
/// Enable the `test-utils` feature to use `MockSessionStore` from other crates.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// `POST /clock-in`
    async fn clock_in(&self) -> Result<ClockSession, StoreError>;

    /// `POST /clock-out`
    async fn clock_out(&self, request: ClockOutRequest) -> Result<ClockSession, StoreError>;

    /// `POST /breaks/start`
    async fn start_break(&self, request: StartBreakRequest) -> Result<BreakUpdate, StoreError>;

    /// `POST /breaks/end`
    async fn end_break(&self, request: EndBreakRequest) -> Result<BreakUpdate, StoreError>;

    /// `GET /status`
    async fn status(&self) -> Result<StatusResponse, StoreError>;

    /// `GET /entries`
    async fn entries(&self) -> Result<EntriesResponse, StoreError>;

    /// `GET /breaks/scheduled`
    async fn scheduled_breaks(&self) -> Result<Vec<ScheduledBreak>, StoreError>;
}
