//! Channel statistics over a filtered view.
//!
//! Only values actually present are counted: a sample without a value for a
//! channel is skipped, never read as zero.

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::ChannelValue;
use crate::services::filter::{FilteredView, TrackView};

/// Values above this many distinct entries are not listed in a profile.
const MAX_DISTINCT_VALUES: usize = 50;

/// Descriptive statistics for one channel of one boat.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ChannelSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (n - 1); absent for a single value.
    pub std_dev: Option<f64>,
    pub min: f64,
    pub max: f64,
}

/// Summarise a set of numeric values. `None` when there are none.
pub fn summarize(values: &[f64]) -> Option<ChannelSummary> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    };
    let std_dev = (n > 1).then(|| {
        let var = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        var.sqrt()
    });

    Some(ChannelSummary {
        count: n,
        mean,
        median,
        std_dev,
        min: sorted[0],
        max: sorted[n - 1],
    })
}

/// Numeric values of `channel` in one boat's filtered samples.
pub fn channel_values(track: &TrackView, channel: &str) -> Vec<f64> {
    track
        .samples
        .iter()
        .filter_map(|s| s.channels.get(channel).and_then(ChannelValue::as_f64))
        .collect()
}

/// Summary of `channel` for one boat of the view.
pub fn summarize_channel(view: &FilteredView, boat_id: &str, channel: &str) -> Option<ChannelSummary> {
    let track = view.track(boat_id)?;
    summarize(&channel_values(track, channel))
}

/// What the filter widgets need to know about a channel.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ChannelProfile {
    pub name: String,
    /// Number of samples carrying a value
    pub present: usize,
    /// Smallest numeric value, if any
    pub min: Option<f64>,
    /// Largest numeric value, if any
    pub max: Option<f64>,
    /// Distinct values in first-seen order; `None` when there are too many to list.
    pub distinct: Option<Vec<ChannelValue>>,
}

/// Profile `channel` across every boat of the view.
pub fn profile_channel(view: &FilteredView, channel: &str) -> ChannelProfile {
    let mut present = 0;
    let mut min: Option<f64> = None;
    let mut max: Option<f64> = None;
    let mut distinct: Vec<ChannelValue> = Vec::new();
    let mut overflowed = false;

    for value in view.samples().filter_map(|s| s.channels.get(channel)) {
        present += 1;
        if let Some(v) = value.as_f64() {
            min = Some(min.map_or(v, |m| m.min(v)));
            max = Some(max.map_or(v, |m| m.max(v)));
        }
        if !overflowed && !distinct.contains(value) {
            if distinct.len() == MAX_DISTINCT_VALUES {
                overflowed = true;
                distinct.clear();
            } else {
                distinct.push(value.clone());
            }
        }
    }

    ChannelProfile {
        name: channel.to_string(),
        present,
        min,
        max,
        distinct: (!overflowed).then_some(distinct),
    }
}
