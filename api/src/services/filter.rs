//! Temporal and categorical filtering over the session dataset.
//!
//! Filtering always starts from the original [`Dataset`] and returns a
//! borrowed [`FilteredView`]; the dataset itself is never touched, so filters
//! compose as one conjunction no matter what order the analyst set them in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use utoipa::ToSchema;

use crate::models::{ChannelReading, ChannelValue, Dataset, Sample, Tack};

/// Which tack to keep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum TackFilter {
    #[default]
    All,
    Starboard,
    Port,
}

impl TackFilter {
    fn accepts(self, tack: Option<Tack>) -> bool {
        match self {
            TackFilter::All => true,
            TackFilter::Starboard => tack == Some(Tack::Starboard),
            TackFilter::Port => tack == Some(Tack::Port),
        }
    }
}

/// Inclusive numeric bounds for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
}

impl NumericRange {
    fn contains(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }
}

/// Everything the analyst has chosen to restrict the view to.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriteria {
    /// Inclusive on both ends.
    pub time_range: (DateTime<Utc>, DateTime<Utc>),
    /// Empty means nothing was selected, not "all boats".
    pub boat_subset: BTreeSet<String>,
    pub tack: TackFilter,
    /// Channel → accepted values; skipped when the dataset lacks the channel
    /// or nothing is picked.
    pub categorical: BTreeMap<String, Vec<ChannelValue>>,
    /// Channel → inclusive range; skipped when the dataset lacks the channel.
    pub numeric_ranges: BTreeMap<String, NumericRange>,
}

impl FilterCriteria {
    /// Criteria that keep every sample of `dataset`.
    ///
    /// Returns `None` for a dataset with no samples (there is no time range).
    pub fn everything(dataset: &Dataset) -> Option<Self> {
        Some(Self {
            time_range: dataset.time_bounds()?,
            boat_subset: dataset.boat_ids().map(str::to_string).collect(),
            tack: TackFilter::All,
            categorical: BTreeMap::new(),
            numeric_ranges: BTreeMap::new(),
        })
    }
}

/// Why a filter produced an empty view without any sample being rejected by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FilterWarning {
    /// No boat was selected.
    EmptyBoatSelection,
    /// The time range ends before it starts.
    InvertedTimeRange,
}

impl FilterWarning {
    pub fn message(&self) -> &'static str {
        match self {
            FilterWarning::EmptyBoatSelection => {
                "No boat selected. Please select at least one boat."
            }
            FilterWarning::InvertedTimeRange => "The start time is after the end time.",
        }
    }
}

/// One boat's samples that survived filtering, still in timestamp order.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackView<'a> {
    pub boat_id: &'a str,
    pub samples: Vec<&'a Sample>,
}

/// A filtered selection over a dataset. Holds references only.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredView<'a> {
    tracks: Vec<TrackView<'a>>,
}

impl<'a> FilteredView<'a> {
    fn empty() -> Self {
        Self { tracks: Vec::new() }
    }

    /// Boats with at least one surviving sample, in dataset order.
    pub fn tracks(&self) -> &[TrackView<'a>] {
        &self.tracks
    }

    pub fn track(&self, boat_id: &str) -> Option<&TrackView<'a>> {
        self.tracks.iter().find(|t| t.boat_id == boat_id)
    }

    pub fn boat_ids(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.tracks.iter().map(|t| t.boat_id)
    }

    pub fn sample_count(&self) -> usize {
        self.tracks.iter().map(|t| t.samples.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Earliest and latest timestamp among the surviving samples.
    pub fn time_bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.tracks
            .iter()
            .filter_map(|t| Some((t.samples.first()?.timestamp, t.samples.last()?.timestamp)))
            .reduce(|(lo, hi), (a, b)| (lo.min(a), hi.max(b)))
    }

    pub fn samples(&self) -> impl Iterator<Item = &'a Sample> + '_ {
        self.tracks.iter().flat_map(|t| t.samples.iter().copied())
    }
}

/// Result of a filter pass: the view plus a warning when it is empty by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome<'a> {
    pub view: FilteredView<'a>,
    pub warning: Option<FilterWarning>,
}

/// A sample without a value for the channel fails; a channel no log carries passes.
fn channel_passes(
    dataset: &Dataset,
    sample: &Sample,
    channel: &str,
    accept: impl Fn(&ChannelValue) -> bool,
) -> bool {
    match dataset.reading(sample, channel) {
        ChannelReading::Value(v) => accept(v),
        ChannelReading::Missing => false,
        ChannelReading::Unknown => true,
    }
}

/// Apply `criteria` to the original dataset.
pub fn filter<'a>(dataset: &'a Dataset, criteria: &FilterCriteria) -> FilterOutcome<'a> {
    if criteria.boat_subset.is_empty() {
        tracing::warn!("Filter requested with an empty boat selection");
        return FilterOutcome {
            view: FilteredView::empty(),
            warning: Some(FilterWarning::EmptyBoatSelection),
        };
    }
    let (start, end) = criteria.time_range;
    if start > end {
        tracing::warn!("Filter time range is inverted: {} > {}", start, end);
        return FilterOutcome {
            view: FilteredView::empty(),
            warning: Some(FilterWarning::InvertedTimeRange),
        };
    }

    for boat in criteria
        .boat_subset
        .iter()
        .filter(|b| dataset.track(b).is_none())
    {
        tracing::debug!("Ignoring unknown boat {} in selection", boat);
    }
    for name in criteria
        .categorical
        .keys()
        .chain(criteria.numeric_ranges.keys())
        .filter(|name| !dataset.has_channel(name))
    {
        tracing::debug!("Ignoring filter on channel {} that no log carries", name);
    }

    let keep = |s: &Sample| {
        s.timestamp >= start
            && s.timestamp <= end
            && criteria.tack.accepts(s.tack)
            && criteria
                .categorical
                .iter()
                .filter(|(_, accepted)| !accepted.is_empty())
                .all(|(name, accepted)| {
                    channel_passes(dataset, s, name, |v| accepted.contains(v))
                })
            && criteria.numeric_ranges.iter().all(|(name, range)| {
                channel_passes(dataset, s, name, |v| {
                    v.as_f64().is_some_and(|v| range.contains(v))
                })
            })
    };

    let tracks: Vec<TrackView<'a>> = dataset
        .tracks()
        .iter()
        .filter(|t| criteria.boat_subset.contains(&t.boat_id))
        .map(|t| TrackView {
            boat_id: t.boat_id.as_str(),
            samples: t.samples.iter().filter(|&s| keep(s)).collect(),
        })
        .filter(|t| !t.samples.is_empty())
        .collect();

    let view = FilteredView { tracks };
    if view.is_empty() {
        tracing::debug!("Filter left no samples");
    } else if let Some((first, last)) = view.time_bounds() {
        tracing::debug!(
            "Filter kept {} of {} samples across {} boats ({} to {})",
            view.sample_count(),
            dataset.sample_count(),
            view.tracks().len(),
            first,
            last
        );
    }
    FilterOutcome {
        view,
        warning: None,
    }
}
