//! Push event channel: a websocket to the session store, reconnected with
//! exponential backoff. Every successful (re)connect pulls a fresh snapshot.

use futures_util::{SinkExt, StreamExt};
use shiftsync_core::SyncEngine;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::{
    client::IntoClientRequest,
    http::{header::AUTHORIZATION, HeaderValue},
    Message,
};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("invalid event channel request: {0}")]
    InvalidRequest(String),
    #[error("event channel connection failed: {0}")]
    ConnectionFailed(String),
}

pub struct EventChannel {
    url: String,
    token: Option<String>,
    engine: Arc<SyncEngine>,
}

impl EventChannel {
    pub fn new(url: impl Into<String>, token: Option<String>, engine: Arc<SyncEngine>) -> Self {
        Self {
            url: url.into(),
            token,
            engine,
        }
    }

    /// Runs until `shutdown` flips to `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut backoff = INITIAL_BACKOFF;
        loop {
            tokio::select! {
                result = self.connect_and_listen() => match result {
                    Ok(()) => {
                        tracing::info!("Event channel closed; reconnecting");
                        backoff = INITIAL_BACKOFF;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Event channel failed");
                    }
                },
                _ = shutdown.changed() => break,
            }
            if *shutdown.borrow() {
                break;
            }

            tracing::info!(backoff_secs = backoff.as_secs(), "Reconnecting event channel after backoff");
            tokio::select! {
                _ = tokio::time::sleep(backoff) => {}
                _ = shutdown.changed() => break,
            }
            backoff = next_backoff(backoff);
        }
        tracing::info!("Event channel stopped");
    }

    fn request(
        &self,
    ) -> Result<tokio_tungstenite::tungstenite::handshake::client::Request, ChannelError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| ChannelError::InvalidRequest(e.to_string()))?;
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ChannelError::InvalidRequest(e.to_string()))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }
        Ok(request)
    }

    /// Returns `Ok` when the server closed the stream, `Err` on failure.
    async fn connect_and_listen(&self) -> Result<(), ChannelError> {
        let (stream, _) = tokio_tungstenite::connect_async(self.request()?)
            .await
            .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;
        let (mut sink, mut frames) = stream.split();
        tracing::info!(url = %self.url, "Connected to event channel");

        // Anything pushed while disconnected is only visible in a snapshot.
        let engine = Arc::clone(&self.engine);
        tokio::spawn(async move {
            if let Err(e) = engine.refresh_snapshot().await {
                tracing::warn!(error = %e, "Snapshot pull after connect failed");
            }
        });

        while let Some(frame) = frames.next().await {
            let frame = frame.map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;
            match frame {
                Message::Text(text) => {
                    if let Err(e) = self.engine.ingest(text.as_str()).await {
                        tracing::warn!(error = %e, "Dropping undecodable event");
                    }
                }
                Message::Ping(payload) => {
                    sink.send(Message::Pong(payload))
                        .await
                        .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;
                }
                Message::Close(_) => {
                    tracing::info!("Event channel closed by server");
                    return Ok(());
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shiftsync_core::{store::MockSessionStore, EngineConfig, NoopMonitor};

    fn engine() -> Arc<SyncEngine> {
        Arc::new(SyncEngine::new(
            EngineConfig::new("u1"),
            Arc::new(MockSessionStore::new()),
            Arc::new(NoopMonitor),
        ))
    }

    #[test]
    fn backoff_doubles_up_to_a_minute() {
        let mut backoff = INITIAL_BACKOFF;
        let mut seen = Vec::new();
        for _ in 0..8 {
            seen.push(backoff.as_secs());
            backoff = next_backoff(backoff);
        }
        assert_eq!(seen, vec![1, 2, 4, 8, 16, 32, 60, 60]);
    }

    #[test]
    fn request_carries_bearer_token() {
        let channel = EventChannel::new("ws://localhost:3000/events", Some("abc".into()), engine());
        let request = channel.request().unwrap();
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer abc");

        let anonymous = EventChannel::new("ws://localhost:3000/events", None, engine());
        assert!(anonymous.request().unwrap().headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn invalid_url_is_rejected() {
        let channel = EventChannel::new("not a url", None, engine());
        assert!(matches!(channel.request(), Err(ChannelError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn shutdown_stops_reconnect_loop() {
        // Nothing listens on the discard port, so every attempt fails fast.
        let channel = EventChannel::new("ws://127.0.0.1:9/events", None, engine());
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(channel.run(rx));
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
