use shiftsync_agent::{
    channel::EventChannel, config::Config, monitor::monitor_from_config,
    poller::run_snapshot_poller, routes::build_router, state::AppState,
};
use shiftsync_core::{ApiClient, SyncEngine};
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "shiftsync_agent=debug,shiftsync_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        api_url = %config.api_url,
        events_url = %config.events_url,
        api_token = %mask_secret(config.api_token.as_deref().unwrap_or_default()),
        user_id = %config.user_id,
        suppression_window_ms = config.suppression_window.as_millis() as u64,
        poll_interval_secs = ?config.poll_interval.map(|p| p.as_secs()),
        monitor_command = ?config.monitor_command,
        "Loaded configuration from environment/.env"
    );

    let mut client = ApiClient::new(config.api_url.clone());
    if let Some(token) = &config.api_token {
        client = client.with_token(token.clone());
    }
    let engine = Arc::new(SyncEngine::new(
        config.engine_config(),
        Arc::new(client),
        monitor_from_config(config.monitor_command.as_deref()),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let channel = EventChannel::new(
        config.events_url.clone(),
        config.api_token.clone(),
        Arc::clone(&engine),
    );
    let channel_task = tokio::spawn(channel.run(shutdown_rx.clone()));
    let poller_task = config.poll_interval.map(|period| {
        tokio::spawn(run_snapshot_poller(
            Arc::clone(&engine),
            period,
            shutdown_rx.clone(),
        ))
    });

    let app = build_router(AppState::new(Arc::clone(&engine)));

    // Start server
    tracing::info!("Local API listening on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutdown requested");
        })
        .await?;

    shutdown_tx.send_replace(true);
    channel_task.await?;
    if let Some(task) = poller_task {
        task.await?;
    }

    Ok(())
}
