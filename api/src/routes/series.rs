use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::errors::{AppError, ErrorResponse};
use crate::routes::{AppState, FilterRequest, WarningBody};
use crate::services::filter::filter;
use crate::services::series::{
    least_squares, paired_points, time_series, LinearFit, TimePoint, XyPoint,
};

/// Channels to plot against each other.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct XyRequest {
    pub x: String,
    pub y: String,
}

/// Request body for POST /api/v1/series.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SeriesRequest {
    #[serde(flatten)]
    pub filter: FilterRequest,
    /// Channels to plot over time
    #[serde(default)]
    pub channels: Vec<String>,
    /// Optional X/Y scatter with a trendline
    #[serde(default)]
    pub xy: Option<XyRequest>,
}

/// Scatter points and their least-squares line for one boat.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct XySeries {
    pub points: Vec<XyPoint>,
    /// Absent with fewer than two points or no spread in x
    pub trendline: Option<LinearFit>,
}

/// Chart data for one boat.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BoatSeries {
    /// Channel → (timestamp, value) points
    pub over_time: BTreeMap<String, Vec<TimePoint>>,
    pub xy: Option<XySeries>,
}

/// Response type for POST /api/v1/series.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SeriesResponse {
    pub warning: Option<WarningBody>,
    /// Boats with samples in the filtered view
    pub boats: BTreeMap<String, BoatSeries>,
}

/// Per-boat chart series: channels over time and an optional X/Y scatter.
#[utoipa::path(
    post,
    path = "/api/v1/series",
    tag = "Series",
    request_body = SeriesRequest,
    responses(
        (status = 200, description = "Channel values over time and X/Y pairs per boat", body = SeriesResponse),
        (status = 400, description = "Unknown channel", body = ErrorResponse),
    )
)]
pub async fn post_series(
    State(state): State<AppState>,
    Json(req): Json<SeriesRequest>,
) -> Result<Json<SeriesResponse>, AppError> {
    let ds = &state.dataset;
    let requested = req
        .channels
        .iter()
        .chain(req.xy.iter().flat_map(|xy| [&xy.x, &xy.y]));
    for channel in requested {
        if !ds.has_channel(channel) {
            return Err(AppError::BadRequest(format!("Unknown channel: {}", channel)));
        }
    }

    let outcome = filter(ds, &req.filter.to_criteria(ds));
    let boats: BTreeMap<String, BoatSeries> = outcome
        .view
        .tracks()
        .iter()
        .map(|track| {
            let over_time: BTreeMap<String, Vec<TimePoint>> = req
                .channels
                .iter()
                .map(|c| (c.clone(), time_series(track, c)))
                .collect();
            let xy = req.xy.as_ref().map(|xy| {
                let points = paired_points(track, &xy.x, &xy.y);
                XySeries {
                    trendline: least_squares(&points),
                    points,
                }
            });
            (track.boat_id.to_string(), BoatSeries { over_time, xy })
        })
        .collect();

    Ok(Json(SeriesResponse {
        warning: outcome.warning.map(WarningBody::from),
        boats,
    }))
}
