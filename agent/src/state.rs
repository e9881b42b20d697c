use shiftsync_core::SyncEngine;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SyncEngine>,
}

impl AppState {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self { engine }
    }
}

impl From<Arc<SyncEngine>> for AppState {
    fn from(engine: Arc<SyncEngine>) -> Self {
        Self::new(engine)
    }
}
