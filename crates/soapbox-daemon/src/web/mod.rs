//! JSON API for the dashboard.

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::state::AppState;
use soapbox_sensors::SensorStatus;

/// Response body for the status endpoint.
#[derive(Serialize)]
struct StatusResponse {
    sensors: HashMap<&'static str, SensorStatus>,
    data_source: &'static str,
}

/// Creates the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/telemetry", get(telemetry))
        .route("/api/status", get(status))
        .route("/api/statistics", get(statistics))
        .route("/api/statistics/reset", post(statistics_reset))
        // The dashboard page may be served from anywhere
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /api/telemetry - Latest polled readings
async fn telemetry(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.latest())
}

/// GET /api/status - Per-channel health and data source
async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(StatusResponse {
        sensors: state.sensor_status(),
        data_source: state.data_source(),
    })
}

/// GET /api/statistics - Session statistics
async fn statistics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.statistics())
}

/// POST /api/statistics/reset - Clear session statistics
async fn statistics_reset(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.reset_statistics())
}
