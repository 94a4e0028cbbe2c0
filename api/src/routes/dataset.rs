use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::{AppError, ErrorResponse};
use crate::models::BoatTrack;
use crate::routes::AppState;
use crate::services::filter::{filter, FilterCriteria};
use crate::services::stats::{profile_channel, ChannelProfile};

/// One boat's entry in the dataset summary.
#[derive(Debug, Serialize, ToSchema)]
pub struct BoatSummary {
    /// Boat name derived from the log file name
    pub boat_id: String,
    pub samples: usize,
    pub first: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
}

impl From<&BoatTrack> for BoatSummary {
    fn from(t: &BoatTrack) -> Self {
        Self {
            boat_id: t.boat_id.clone(),
            samples: t.samples.len(),
            first: t.first_timestamp(),
            last: t.last_timestamp(),
        }
    }
}

/// Response type for GET /api/v1/dataset.
#[derive(Debug, Serialize, ToSchema)]
pub struct DatasetResponse {
    /// Earliest sample across all boats
    pub start: Option<DateTime<Utc>>,
    /// Latest sample across all boats
    pub end: Option<DateTime<Utc>>,
    /// Boats in log upload order
    pub boats: Vec<BoatSummary>,
    /// Union of the channels present in any log
    pub channels: Vec<String>,
}

/// Describe the loaded session dataset.
#[utoipa::path(
    get,
    path = "/api/v1/dataset",
    tag = "Dataset",
    responses(
        (status = 200, description = "Boats, time span and channels", body = DatasetResponse),
    )
)]
pub async fn get_dataset(State(state): State<AppState>) -> Json<DatasetResponse> {
    let ds = &state.dataset;
    let bounds = ds.time_bounds();
    Json(DatasetResponse {
        start: bounds.map(|b| b.0),
        end: bounds.map(|b| b.1),
        boats: ds.tracks().iter().map(BoatSummary::from).collect(),
        channels: ds.channels().to_vec(),
    })
}

/// Profile one channel across the whole dataset (range and distinct values).
#[utoipa::path(
    get,
    path = "/api/v1/dataset/channels/{name}",
    tag = "Dataset",
    params(
        ("name" = String, Path, description = "Channel name, e.g. TRK_LEG_NUM_unk"),
    ),
    responses(
        (status = 200, description = "Channel profile", body = ChannelProfile),
        (status = 404, description = "No log has this channel", body = ErrorResponse),
    )
)]
pub async fn get_channel_profile(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ChannelProfile>, AppError> {
    let ds = &state.dataset;
    if !ds.has_channel(&name) {
        return Err(AppError::NotFound(format!("Channel {} not found", name)));
    }
    let criteria = FilterCriteria::everything(ds)
        .ok_or_else(|| AppError::NotFound("No telemetry loaded".to_string()))?;
    let outcome = filter(ds, &criteria);
    Ok(Json(profile_channel(&outcome.view, &name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::t0;
    use crate::routes::test_support;

    #[tokio::test]
    async fn test_get_dataset() {
        let Json(body) = get_dataset(State(test_support::state())).await;
        assert_eq!(body.start, Some(t0()));
        assert_eq!(body.end, Some(t0() + chrono::Duration::seconds(990)));
        assert_eq!(body.boats.len(), 2);
        assert_eq!(body.boats[0].boat_id, "Alpha");
        assert_eq!(body.boats[0].samples, 100);
        assert_eq!(body.channels, vec!["AWA_SGP_deg"]);
    }

    #[tokio::test]
    async fn test_channel_profile() {
        let Json(profile) = get_channel_profile(
            State(test_support::state()),
            Path("AWA_SGP_deg".to_string()),
        )
        .await
        .unwrap();
        assert_eq!(profile.present, 200);
        assert_eq!(profile.min, Some(-30.0));
        assert_eq!(profile.max, Some(30.0));
    }

    #[tokio::test]
    async fn test_unknown_channel_is_not_found() {
        let result =
            get_channel_profile(State(test_support::state()), Path("NOPE".to_string())).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
