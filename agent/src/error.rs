use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shiftsync_core::{EngineError, StoreError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug)]
pub enum AppError {
    /// The engine refused the command in its current state.
    Conflict(String),
    BadRequest(String),
    /// The session store answered and refused.
    Rejected(String),
    /// The session store could not be reached or answered garbage.
    BadGateway(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, code) = match self {
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, "CONFLICT"),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, "BAD_REQUEST"),
            AppError::Rejected(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg, "REJECTED"),
            AppError::BadGateway(msg) => {
                tracing::error!("Session store unavailable: {}", msg);
                (StatusCode::BAD_GATEWAY, msg, "BAD_GATEWAY")
            }
            AppError::InternalServerError(err) => {
                tracing::error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_SERVER_ERROR",
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidRequest(msg) => AppError::BadRequest(msg),
            EngineError::Store(StoreError::Rejected { message, .. }) => AppError::Rejected(message),
            EngineError::Store(store) => AppError::BadGateway(store.to_string()),
            local => AppError::Conflict(local.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::InternalServerError(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn response_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn app_error_into_response_maps_status_and_body() {
        let response = AppError::BadRequest("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(json["error"], "bad");
        assert_eq!(json["code"], "BAD_REQUEST");

        let response = AppError::Conflict("busy".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = response_json(response).await;
        assert_eq!(json["code"], "CONFLICT");

        let response = AppError::Rejected("Already clocked in".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = response_json(response).await;
        assert_eq!(json["error"], "Already clocked in");
        assert_eq!(json["code"], "REJECTED");

        let response = AppError::InternalServerError(anyhow::anyhow!("boom")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = response_json(response).await;
        assert_eq!(json["error"], "Internal server error");
    }

    #[tokio::test]
    async fn engine_errors_map_by_origin() {
        let response = AppError::from(EngineError::BreakAlreadyActive).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(response_json(response).await["error"], "a break is already active");

        let response =
            AppError::from(EngineError::InvalidRequest("reason required".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = AppError::from(EngineError::Store(StoreError::Connectivity(
            "connection refused".into(),
        )))
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response =
            AppError::from(EngineError::Store(StoreError::Decode("eof".into()))).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
