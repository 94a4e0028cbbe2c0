//! Playback HTTP endpoints.
//!
//! GET  /api/v1/playback         : current scrub time, bounds and step
//! POST /api/v1/playback/toggle  : play/pause
//! POST /api/v1/playback/tick    : advance one step while playing
//! POST /api/v1/playback/seek    : jump to a time (clamped into the session)

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::{AppError, ErrorResponse};
use crate::routes::{AppState, Playback};
use crate::services::playback::PlaybackState;

/// Response type for every playback endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PlaybackResponse {
    pub state: PlaybackState,
    /// First sample of the session
    pub start: DateTime<Utc>,
    /// Last sample of the session
    pub end: DateTime<Utc>,
    /// Simulated seconds advanced per tick
    pub step_secs: i64,
}

/// Request body for POST /api/v1/playback/seek.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SeekRequest {
    pub time: DateTime<Utc>,
}

fn respond(playback: &Playback, state: PlaybackState) -> Json<PlaybackResponse> {
    Json(PlaybackResponse {
        state,
        start: playback.clock.start,
        end: playback.clock.end,
        step_secs: playback.clock.step.num_seconds(),
    })
}

/// Apply one transition under the write lock and return the new state.
async fn transition(
    state: &AppState,
    f: impl FnOnce(&Playback, PlaybackState) -> PlaybackState,
) -> Result<Json<PlaybackResponse>, AppError> {
    let playback = state.playback()?;
    let mut current = playback.state.write().await;
    *current = f(playback, *current);
    Ok(respond(playback, *current))
}

/// Get the current playback state.
#[utoipa::path(
    get,
    path = "/api/v1/playback",
    tag = "Playback",
    responses(
        (status = 200, description = "Current playback state", body = PlaybackResponse),
        (status = 404, description = "No telemetry loaded", body = ErrorResponse),
    )
)]
pub async fn get_playback(
    State(state): State<AppState>,
) -> Result<Json<PlaybackResponse>, AppError> {
    let playback = state.playback()?;
    let current = *playback.state.read().await;
    Ok(respond(playback, current))
}

/// Toggle play/pause. Has no effect on the scrub time.
#[utoipa::path(
    post,
    path = "/api/v1/playback/toggle",
    tag = "Playback",
    responses(
        (status = 200, description = "Playback state after toggling", body = PlaybackResponse),
        (status = 404, description = "No telemetry loaded", body = ErrorResponse),
    )
)]
pub async fn toggle_playback(
    State(state): State<AppState>,
) -> Result<Json<PlaybackResponse>, AppError> {
    transition(&state, |p, s| p.clock.toggle(s)).await
}

/// Advance the scrub time by one step if playing.
///
/// The dashboard calls this on its own timer; reaching the end pauses playback.
#[utoipa::path(
    post,
    path = "/api/v1/playback/tick",
    tag = "Playback",
    responses(
        (status = 200, description = "Playback state after the tick", body = PlaybackResponse),
        (status = 404, description = "No telemetry loaded", body = ErrorResponse),
    )
)]
pub async fn tick_playback(
    State(state): State<AppState>,
) -> Result<Json<PlaybackResponse>, AppError> {
    transition(&state, |p, s| p.clock.tick(s)).await
}

/// Move the scrub time, clamped to the session's first and last sample.
#[utoipa::path(
    post,
    path = "/api/v1/playback/seek",
    tag = "Playback",
    request_body = SeekRequest,
    responses(
        (status = 200, description = "Playback state after seeking", body = PlaybackResponse),
        (status = 404, description = "No telemetry loaded", body = ErrorResponse),
    )
)]
pub async fn seek_playback(
    State(state): State<AppState>,
    Json(req): Json<SeekRequest>,
) -> Result<Json<PlaybackResponse>, AppError> {
    transition(&state, |p, s| p.clock.seek(s, req.time)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::t0;
    use crate::models::{Dataset, RaceCourse};
    use crate::routes::test_support;
    use chrono::Duration;

    #[tokio::test]
    async fn test_initial_state() {
        let Json(body) = get_playback(State(test_support::state())).await.unwrap();
        assert_eq!(body.state, PlaybackState::paused_at(t0()));
        assert_eq!(body.start, t0());
        assert_eq!(body.end, t0() + Duration::seconds(990));
        assert_eq!(body.step_secs, 10);
    }

    #[tokio::test]
    async fn test_play_and_tick_five_times() {
        let state = test_support::state();
        let Json(body) = toggle_playback(State(state.clone())).await.unwrap();
        assert!(body.state.playing);

        for _ in 0..5 {
            tick_playback(State(state.clone())).await.unwrap();
        }
        let Json(body) = get_playback(State(state)).await.unwrap();
        assert_eq!(body.state.current_time, t0() + Duration::seconds(50));
        assert!(body.state.playing);
    }

    #[tokio::test]
    async fn test_tick_while_paused_is_noop() {
        let state = test_support::state();
        let Json(body) = tick_playback(State(state)).await.unwrap();
        assert_eq!(body.state, PlaybackState::paused_at(t0()));
    }

    #[tokio::test]
    async fn test_seek_clamps_into_session() {
        let state = test_support::state();
        let Json(body) = seek_playback(
            State(state.clone()),
            Json(SeekRequest {
                time: t0() + Duration::hours(2),
            }),
        )
        .await
        .unwrap();
        assert_eq!(body.state.current_time, body.end);

        let Json(body) = seek_playback(
            State(state.clone()),
            Json(SeekRequest {
                time: t0() + Duration::seconds(300),
            }),
        )
        .await
        .unwrap();
        assert_eq!(body.state.current_time, t0() + Duration::minutes(5));

        // Later reads see the sought time
        let Json(body) = get_playback(State(state)).await.unwrap();
        assert_eq!(body.state.current_time, t0() + Duration::minutes(5));
    }

    #[tokio::test]
    async fn test_empty_session_has_no_playback() {
        let state = AppState::new(
            Dataset::default(),
            RaceCourse::default(),
            Duration::seconds(10),
        );
        assert!(matches!(
            get_playback(State(state.clone())).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            toggle_playback(State(state)).await,
            Err(AppError::NotFound(_))
        ));
    }
}
