use anyhow::{anyhow, Context};
use shiftsync_core::{config::DEFAULT_SUPPRESSION_WINDOW, EngineConfig};
use std::{env, net::SocketAddr, time::Duration};

const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:4870";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub events_url: String,
    pub api_token: Option<String>,
    pub user_id: String,
    pub suppression_window: Duration,
    /// `None` disables periodic snapshot pulls.
    pub poll_interval: Option<Duration>,
    /// Executable driving the local activity tracker. Absent on runtimes
    /// without one.
    pub monitor_command: Option<String>,
    pub listen_addr: SocketAddr,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_url = var("SHIFTSYNC_API_URL")
            .ok_or_else(|| anyhow!("SHIFTSYNC_API_URL must be set"))?
            .trim_end_matches('/')
            .to_string();

        let events_url = match var("SHIFTSYNC_EVENTS_URL") {
            Some(url) => url,
            None => derive_events_url(&api_url)?,
        };

        let user_id =
            var("SHIFTSYNC_USER_ID").ok_or_else(|| anyhow!("SHIFTSYNC_USER_ID must be set"))?;

        let suppression_window = match var("SHIFTSYNC_SUPPRESSION_WINDOW_MS") {
            Some(ms) => Duration::from_millis(
                ms.parse()
                    .with_context(|| format!("Invalid SHIFTSYNC_SUPPRESSION_WINDOW_MS value: {ms}"))?,
            ),
            None => DEFAULT_SUPPRESSION_WINDOW,
        };

        let poll_secs: u64 = match var("SHIFTSYNC_POLL_INTERVAL_SECS") {
            Some(secs) => secs
                .parse()
                .with_context(|| format!("Invalid SHIFTSYNC_POLL_INTERVAL_SECS value: {secs}"))?,
            None => DEFAULT_POLL_INTERVAL_SECS,
        };
        let poll_interval = (poll_secs > 0).then(|| Duration::from_secs(poll_secs));

        let listen_addr = var("SHIFTSYNC_LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr: SocketAddr = listen_addr
            .parse()
            .map_err(|_| anyhow!("Invalid SHIFTSYNC_LISTEN_ADDR value: {}", listen_addr))?;

        Ok(Config {
            api_url,
            events_url,
            api_token: var("SHIFTSYNC_API_TOKEN"),
            user_id,
            suppression_window,
            poll_interval,
            monitor_command: var("SHIFTSYNC_MONITOR_COMMAND"),
            listen_addr,
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(self.user_id.as_str()).with_suppression_window(self.suppression_window)
    }
}

/// `http://host/api` becomes `ws://host/api/events`.
fn derive_events_url(api_url: &str) -> anyhow::Result<String> {
    let (scheme, rest) = api_url
        .split_once("://")
        .ok_or_else(|| anyhow!("SHIFTSYNC_API_URL has no scheme: {}", api_url))?;
    let ws_scheme = match scheme {
        "http" => "ws",
        "https" => "wss",
        other => return Err(anyhow!("Unsupported SHIFTSYNC_API_URL scheme: {}", other)),
    };
    Ok(format!("{ws_scheme}://{rest}/events"))
}
