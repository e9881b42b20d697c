use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

use super::{
    types::{
        ApiError, ClockOutRequest, EndBreakRequest, EntriesResponse, StartBreakRequest,
        StatusResponse,
    },
    SessionStore,
};
use crate::{
    error::StoreError,
    models::{BreakUpdate, ClockSession, ScheduledBreak},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// reqwest-backed [`SessionStore`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.timeout(REQUEST_TIMEOUT);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn handle_unauthorized_status(status: StatusCode) {
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Session store rejected the API token; check SHIFTSYNC_API_TOKEN");
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StoreError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| StoreError::Connectivity(e.to_string()))?;

        let status = response.status();
        Self::handle_unauthorized_status(status);
        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| StoreError::Decode(e.to_string()))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(StoreError::Rejected {
                status: status.as_u16(),
                message: error_message(&body, status),
            })
        }
    }
}

fn error_message(body: &str, status: StatusCode) -> String {
    if let Ok(error) = serde_json::from_str::<ApiError>(body) {
        return error.error;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl SessionStore for ApiClient {
    async fn clock_in(&self) -> Result<ClockSession, StoreError> {
        self.send(self.client.post(self.url("/clock-in")).json(&json!({})))
            .await
    }

    async fn clock_out(&self, request: ClockOutRequest) -> Result<ClockSession, StoreError> {
        self.send(self.client.post(self.url("/clock-out")).json(&request))
            .await
    }

    async fn start_break(&self, request: StartBreakRequest) -> Result<BreakUpdate, StoreError> {
        self.send(self.client.post(self.url("/breaks/start")).json(&request))
            .await
    }

    async fn end_break(&self, request: EndBreakRequest) -> Result<BreakUpdate, StoreError> {
        self.send(self.client.post(self.url("/breaks/end")).json(&request))
            .await
    }

    async fn status(&self) -> Result<StatusResponse, StoreError> {
        self.send(self.client.get(self.url("/status"))).await
    }

    async fn entries(&self) -> Result<EntriesResponse, StoreError> {
        self.send(self.client.get(self.url("/entries"))).await
    }

    async fn scheduled_breaks(&self) -> Result<Vec<ScheduledBreak>, StoreError> {
        self.send(self.client.get(self.url("/breaks/scheduled")))
            .await
    }
}
