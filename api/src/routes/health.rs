use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::routes::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status ("ok" when telemetry is loaded, "empty" otherwise)
    pub status: String,
    /// API version
    pub version: String,
    /// Number of boats in the session dataset
    pub boats: usize,
    /// Number of samples in the session dataset
    pub samples: usize,
}

/// Health check endpoint.
///
/// Still 200 with status "empty" when no logs were found, so the dashboard
/// can tell a running service apart from one with nothing to show.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let samples = state.dataset.sample_count();
    Json(HealthResponse {
        status: if samples > 0 {
            "ok".to_string()
        } else {
            "empty".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        boats: state.dataset.tracks().len(),
        samples,
    })
}
