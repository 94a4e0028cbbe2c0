use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::errors::{AppError, ErrorResponse};
use crate::routes::{AppState, FilterRequest, WarningBody};
use crate::services::filter::filter;
use crate::services::stats::{summarize_channel, ChannelSummary};

/// Request body for POST /api/v1/stats.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct StatsRequest {
    #[serde(flatten)]
    pub filter: FilterRequest,
    /// Channels to summarise
    pub channels: Vec<String>,
}

/// Response type for POST /api/v1/stats.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatsResponse {
    pub warning: Option<WarningBody>,
    /// Boat → channel → summary; `null` when the boat has no value for the channel
    #[schema(value_type = Object)]
    pub boats: BTreeMap<String, BTreeMap<String, Option<ChannelSummary>>>,
}

/// Summary statistics per selected boat for the requested channels.
#[utoipa::path(
    post,
    path = "/api/v1/stats",
    tag = "Stats",
    request_body = StatsRequest,
    responses(
        (status = 200, description = "Mean, median, std-dev, min and max per boat and channel", body = StatsResponse),
        (status = 400, description = "Unknown channel", body = ErrorResponse),
    )
)]
pub async fn post_stats(
    State(state): State<AppState>,
    Json(req): Json<StatsRequest>,
) -> Result<Json<StatsResponse>, AppError> {
    let ds = &state.dataset;
    if let Some(unknown) = req.channels.iter().find(|c| !ds.has_channel(c)) {
        return Err(AppError::BadRequest(format!("Unknown channel: {}", unknown)));
    }

    let outcome = filter(ds, &req.filter.to_criteria(ds));
    let boats: BTreeMap<String, BTreeMap<String, Option<ChannelSummary>>> = outcome
        .view
        .boat_ids()
        .map(|boat| {
            let per_channel: BTreeMap<String, Option<ChannelSummary>> = req
                .channels
                .iter()
                .map(|c| (c.clone(), summarize_channel(&outcome.view, boat, c)))
                .collect();
            (boat.to_string(), per_channel)
        })
        .collect();

    Ok(Json(StatsResponse {
        warning: outcome.warning.map(WarningBody::from),
        boats,
    }))
}
