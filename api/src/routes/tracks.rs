use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::models::{ChannelValue, CourseMark, Position, Sample, Tack};
use crate::routes::{AppState, FilterRequest, WarningBody};
use crate::services::assembler::assemble;
use crate::services::filter::filter;
use crate::services::resolver::Resolution;

/// Request body for POST /api/v1/tracks.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct TracksRequest {
    #[serde(flatten)]
    pub filter: FilterRequest,
    /// Scrub time; defaults to the session's playback time
    #[serde(default)]
    pub query_time: Option<DateTime<Utc>>,
}

/// A resolved sample with every channel it carries.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SampleResponse {
    pub boat_id: String,
    pub timestamp: DateTime<Utc>,
    /// Absent when the GPS fix was blank
    pub position: Option<Position>,
    /// Apparent wind angle in degrees, when logged
    pub apparent_wind_angle: Option<f64>,
    pub tack: Option<Tack>,
    pub channels: BTreeMap<String, ChannelValue>,
}

impl From<&Sample> for SampleResponse {
    fn from(s: &Sample) -> Self {
        Self {
            boat_id: s.boat_id.clone(),
            timestamp: s.timestamp,
            position: s.position,
            apparent_wind_angle: s.apparent_wind_angle,
            tack: s.tack,
            channels: s.channels.clone(),
        }
    }
}

/// A boat's state at the query time.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CurrentPosition {
    /// The boat has a last known sample at or before the query time
    Known { sample: SampleResponse },
    /// The query time is before the boat's first sample
    NotYetStarted,
}

impl From<Resolution<'_>> for CurrentPosition {
    fn from(r: Resolution<'_>) -> Self {
        r.sample()
            .map_or(CurrentPosition::NotYetStarted, |s| CurrentPosition::Known {
                sample: s.into(),
            })
    }
}

/// Response type for POST /api/v1/tracks.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TracksResponse {
    pub query_time: DateTime<Utc>,
    /// Set when the selection is empty by construction (no boats, inverted window)
    pub warning: Option<WarningBody>,
    /// Full filtered path per boat; boats with no samples in the view are absent
    pub tracks: BTreeMap<String, Vec<Position>>,
    /// Last known state per boat at `query_time`; same boats as `tracks`
    pub positions: BTreeMap<String, CurrentPosition>,
    pub marks: Vec<CourseMark>,
    /// Course boundary, closed
    pub boundary_polygon: Vec<Position>,
}

/// Assemble full tracks and current positions for the selected boats.
#[utoipa::path(
    post,
    path = "/api/v1/tracks",
    tag = "Tracks",
    request_body = TracksRequest,
    responses(
        (status = 200, description = "Tracks, positions at the query time, course overlay", body = TracksResponse),
    )
)]
pub async fn post_tracks(
    State(state): State<AppState>,
    Json(req): Json<TracksRequest>,
) -> Json<TracksResponse> {
    let query_time = match req.query_time {
        Some(t) => t,
        None => state
            .current_time()
            .await
            .unwrap_or(DateTime::<Utc>::MIN_UTC),
    };

    let ds = &state.dataset;
    let criteria = req.filter.to_criteria(ds);
    let selected = req.filter.selected_boats(ds);
    let outcome = filter(ds, &criteria);
    let assembly = assemble(&outcome.view, &selected, query_time, &state.course);

    Json(TracksResponse {
        query_time: assembly.query_time,
        warning: outcome.warning.map(WarningBody::from),
        tracks: assembly.tracks,
        positions: assembly
            .positions
            .into_iter()
            .map(|(boat, r)| (boat, CurrentPosition::from(r)))
            .collect(),
        marks: assembly.marks.to_vec(),
        boundary_polygon: assembly.boundary_polygon,
    })
}
