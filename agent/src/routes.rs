use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{handlers, state::AppState};

/// Local API consumed by the presentation layer.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::status::health))
        .route("/api/state", get(handlers::status::get_state))
        .route("/api/refresh", post(handlers::status::refresh))
        .route("/api/clock-in", post(handlers::session::clock_in))
        .route("/api/clock-out", post(handlers::session::clock_out))
        .route("/api/breaks/start", post(handlers::breaks::start_break))
        .route("/api/breaks/end", post(handlers::breaks::end_break))
        .route("/api/breaks/pause", post(handlers::breaks::pause_break))
        .route("/api/breaks/resume", post(handlers::breaks::resume_break))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                        .allow_headers(Any)
                        .max_age(std::time::Duration::from_secs(24 * 60 * 60)),
                ),
        )
        .with_state(state)
}
