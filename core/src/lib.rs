//! Client-side clock and break reconciliation.
//!
//! [`SyncEngine`] keeps one cached view of a worker's clock sessions and
//! breaks consistent across three sources: the session store's REST API, the
//! store's push event channel, and the local activity monitor.

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod models;
pub mod monitor;
pub mod store;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use config::EngineConfig;
pub use engine::{EngineNotice, EventOutcome, LocalOnly, SnapshotOutcome, SyncEngine};
pub use error::{EngineError, StoreError};
pub use events::{EventError, SyncEvent};
pub use monitor::{ActivityMonitor, MonitorError, NoopMonitor, PauseRequest};
pub use store::{ApiClient, SessionStore};
