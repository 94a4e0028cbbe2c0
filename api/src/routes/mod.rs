pub mod course;
pub mod dataset;
pub mod health;
pub mod playback;
pub mod series;
pub mod stats;
pub mod tracks;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::models::{ChannelValue, Dataset, RaceCourse};
use crate::services::filter::{FilterCriteria, FilterWarning, NumericRange, TackFilter};
use crate::services::playback::{PlaybackClock, PlaybackState};

/// Playback clock plus the mutable scrub state for the session.
#[derive(Debug)]
pub struct Playback {
    pub clock: PlaybackClock,
    pub state: RwLock<PlaybackState>,
}

/// Shared application state: one analysis session per process.
#[derive(Debug, Clone)]
pub struct AppState {
    pub dataset: Arc<Dataset>,
    pub course: Arc<RaceCourse>,
    /// `None` when no telemetry was loaded (nothing to scrub through).
    pub playback: Option<Arc<Playback>>,
}

impl AppState {
    pub fn new(dataset: Dataset, course: RaceCourse, step: Duration) -> Self {
        let playback = dataset.time_bounds().map(|(start, end)| {
            Arc::new(Playback {
                clock: PlaybackClock::new(start, end, step),
                state: RwLock::new(PlaybackState::paused_at(start)),
            })
        });
        Self {
            dataset: Arc::new(dataset),
            course: Arc::new(course),
            playback,
        }
    }

    pub fn playback(&self) -> Result<&Arc<Playback>, AppError> {
        self.playback
            .as_ref()
            .ok_or_else(|| AppError::NotFound("No telemetry loaded".to_string()))
    }

    /// Current scrub time, if there is any telemetry.
    pub async fn current_time(&self) -> Option<DateTime<Utc>> {
        match &self.playback {
            Some(p) => Some(p.state.read().await.current_time),
            None => None,
        }
    }
}

/// Filter selection sent by the dashboard. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct FilterRequest {
    /// Window start (inclusive); defaults to the first sample
    pub start: Option<DateTime<Utc>>,
    /// Window end (inclusive); defaults to the last sample
    pub end: Option<DateTime<Utc>>,
    /// Boats to include; omitted means all, an empty list means none
    pub boats: Option<Vec<String>>,
    pub tack: TackFilter,
    /// Channel name → accepted values
    pub categorical: BTreeMap<String, Vec<ChannelValue>>,
    /// Channel name → inclusive numeric range
    pub numeric_ranges: BTreeMap<String, NumericRange>,
}

impl FilterRequest {
    /// Boats the request selects, in request order (dataset order when omitted).
    pub fn selected_boats(&self, dataset: &Dataset) -> Vec<String> {
        match &self.boats {
            Some(boats) => boats.clone(),
            None => dataset.boat_ids().map(str::to_string).collect(),
        }
    }

    pub fn to_criteria(&self, dataset: &Dataset) -> FilterCriteria {
        let (lo, hi) = dataset
            .time_bounds()
            .unwrap_or((DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC));
        FilterCriteria {
            time_range: (self.start.unwrap_or(lo), self.end.unwrap_or(hi)),
            boat_subset: self.selected_boats(dataset).into_iter().collect(),
            tack: self.tack,
            categorical: self.categorical.clone(),
            numeric_ranges: self.numeric_ranges.clone(),
        }
    }
}

/// User-facing notice attached to an empty filter result.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct WarningBody {
    pub code: FilterWarning,
    pub message: String,
}

impl From<FilterWarning> for WarningBody {
    fn from(w: FilterWarning) -> Self {
        Self {
            code: w,
            message: w.message().to_string(),
        }
    }
}
