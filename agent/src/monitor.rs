//! Activity monitor backed by an external command.
//!
//! The tracker is invoked as `<cmd> pause <TYPE> <minutes> <breakId>` and
//! `<cmd> resume`.

use async_trait::async_trait;
use shiftsync_core::{ActivityMonitor, MonitorError, NoopMonitor, PauseRequest};
use std::{io, sync::Arc};
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct ProcessMonitor {
    program: String,
}

impl ProcessMonitor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn pause_args(request: &PauseRequest) -> Vec<String> {
        vec![
            "pause".to_string(),
            request.break_type.as_str().to_string(),
            request.duration_minutes.to_string(),
            request.break_id.to_string(),
        ]
    }

    async fn run(&self, args: &[String]) -> Result<(), MonitorError> {
        let output = Command::new(&self.program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => MonitorError::Unavailable,
                _ => MonitorError::Failed(e.to_string()),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(MonitorError::Failed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )))
        }
    }
}

#[async_trait]
impl ActivityMonitor for ProcessMonitor {
    async fn pause(&self, request: &PauseRequest) -> Result<(), MonitorError> {
        self.run(&Self::pause_args(request)).await
    }

    async fn resume(&self) -> Result<(), MonitorError> {
        self.run(&["resume".to_string()]).await
    }
}

pub fn monitor_from_config(command: Option<&str>) -> Arc<dyn ActivityMonitor> {
    match command {
        Some(program) => {
            tracing::info!(program, "Driving activity monitor through external command");
            Arc::new(ProcessMonitor::new(program))
        }
        None => {
            tracing::info!("No activity monitor configured");
            Arc::new(NoopMonitor)
        }
    }
}
