//! Core telemetry and course types shared by the engine services.
//!
//! A [`Dataset`] is built once from the uploaded logs and never mutated;
//! filtering produces borrowed views over it (see `services::filter`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use utoipa::ToSchema;

/// A single value in an open-ended telemetry channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ChannelValue {
    Number(f64),
    Text(String),
}

impl ChannelValue {
    /// Parse a raw cell: numeric when it parses as a finite f64, text otherwise.
    /// Blank cells carry no value.
    pub fn from_cell(cell: &str) -> Option<Self> {
        let cell = cell.trim();
        if cell.is_empty() {
            return None;
        }
        match cell.parse::<f64>() {
            Ok(v) if v.is_finite() => Some(ChannelValue::Number(v)),
            Ok(_) => None,
            Err(_) => Some(ChannelValue::Text(cell.to_string())),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ChannelValue::Number(v) => Some(*v),
            ChannelValue::Text(_) => None,
        }
    }
}

/// Sail state derived from the apparent wind angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Tack {
    Starboard,
    Port,
}

impl Tack {
    /// Positive apparent wind angle is starboard; zero and negative are port.
    pub fn from_apparent_wind_angle(awa_deg: f64) -> Self {
        if awa_deg > 0.0 {
            Tack::Starboard
        } else {
            Tack::Port
        }
    }
}

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Position {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
}

/// One telemetry reading for one boat.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub boat_id: String,
    pub timestamp: DateTime<Utc>,
    /// `None` when the GPS fix is blank for this row.
    pub position: Option<Position>,
    pub apparent_wind_angle: Option<f64>,
    /// Computed once at ingestion; `None` when the boat has no wind angle.
    pub tack: Option<Tack>,
    /// Every non-timestamp column of the source row that had a value.
    pub channels: BTreeMap<String, ChannelValue>,
}

impl AsRef<Sample> for Sample {
    fn as_ref(&self) -> &Sample {
        self
    }
}

/// All samples of one boat, sorted ascending by timestamp (stable for ties).
#[derive(Debug, Clone, PartialEq)]
pub struct BoatTrack {
    pub boat_id: String,
    pub samples: Vec<Sample>,
}

impl BoatTrack {
    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.samples.first().map(|s| s.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.samples.last().map(|s| s.timestamp)
    }
}

/// How a channel lookup on a sample turned out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelReading<'a> {
    Value(&'a ChannelValue),
    /// The dataset has this channel, but this sample carries no value for it.
    Missing,
    /// No source in the dataset has this channel.
    Unknown,
}

/// The unified, immutable session dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    tracks: Vec<BoatTrack>,
    index: HashMap<String, usize>,
    channels: Vec<String>,
    time_bounds: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl Dataset {
    /// Build a dataset from tracks in source insertion order and the union of
    /// their channel names (first-seen order).
    ///
    /// Each track must already be sorted by timestamp.
    pub fn new(tracks: Vec<BoatTrack>, channels: Vec<String>) -> Self {
        let index = tracks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.boat_id.clone(), i))
            .collect();

        let time_bounds = tracks
            .iter()
            .filter_map(|t| Some((t.first_timestamp()?, t.last_timestamp()?)))
            .reduce(|(lo, hi), (a, b)| (lo.min(a), hi.max(b)));

        Self {
            tracks,
            index,
            channels,
            time_bounds,
        }
    }

    pub fn tracks(&self) -> &[BoatTrack] {
        &self.tracks
    }

    pub fn track(&self, boat_id: &str) -> Option<&BoatTrack> {
        self.index.get(boat_id).map(|&i| &self.tracks[i])
    }

    pub fn boat_ids(&self) -> impl Iterator<Item = &str> {
        self.tracks.iter().map(|t| t.boat_id.as_str())
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.iter().any(|c| c == name)
    }

    /// Earliest and latest timestamp across all tracks.
    pub fn time_bounds(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.time_bounds
    }

    pub fn sample_count(&self) -> usize {
        self.tracks.iter().map(|t| t.samples.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count() == 0
    }

    pub fn reading<'a>(&self, sample: &'a Sample, channel: &str) -> ChannelReading<'a> {
        match sample.channels.get(channel) {
            Some(v) => ChannelReading::Value(v),
            None if self.has_channel(channel) => ChannelReading::Missing,
            None => ChannelReading::Unknown,
        }
    }
}

/// A course mark: the centroid of all points sharing one compound-mark id.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CourseMark {
    /// Compound mark identifier from the course document
    pub id: String,
    /// Display name
    pub name: String,
    pub position: Position,
}

/// Boundary vertices in source order. Not closed; see [`CourseBoundary::closed`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseBoundary {
    pub vertices: Vec<Position>,
}

impl CourseBoundary {
    /// Return the vertices with the first one appended at the end.
    ///
    /// Applied once by the consumer; the loader never closes the ring.
    pub fn closed(&self) -> Vec<Position> {
        let mut ring = self.vertices.clone();
        if let Some(first) = self.vertices.first() {
            ring.push(*first);
        }
        ring
    }
}

/// Marks keyed by compound-mark id (kept in document order) plus the boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RaceCourse {
    pub marks: Vec<CourseMark>,
    pub boundary: CourseBoundary,
}

impl RaceCourse {
    pub fn mark(&self, id: &str) -> Option<&CourseMark> {
        self.marks.iter().find(|m| m.id == id)
    }
}
