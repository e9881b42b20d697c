use shiftsync_core::{SnapshotOutcome, SyncEngine};
use std::{sync::Arc, time::Duration};
use tokio::{sync::watch, time::MissedTickBehavior};

/// Periodically pulls a full snapshot as a safety net for missed events.
pub async fn run_snapshot_poller(
    engine: Arc<SyncEngine>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the channel already pulls on connect.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => break,
        }
        match engine.refresh_snapshot().await {
            Ok(SnapshotOutcome::Applied) => tracing::debug!("Periodic snapshot applied"),
            Ok(SnapshotOutcome::Suppressed) => {
                tracing::debug!("Periodic snapshot suppressed by recent event")
            }
            Err(e) => tracing::warn!(error = %e, "Periodic snapshot pull failed"),
        }
    }
    tracing::info!("Snapshot poller stopped");
}
