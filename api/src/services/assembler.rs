//! Multi-boat track assembly for the map view.
//!
//! For each selected boat: the whole filtered path (never truncated at the
//! query time) plus the position resolved at the query time. The course
//! overlay comes along with its boundary closed exactly once here.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::models::{CourseMark, Position, RaceCourse};
use crate::services::filter::FilteredView;
use crate::services::resolver::{resolve, Resolution};

/// Everything the map needs for one redraw.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly<'a> {
    pub query_time: DateTime<Utc>,
    /// Full filtered path per boat; samples without a GPS fix are skipped.
    pub tracks: BTreeMap<String, Vec<Position>>,
    pub positions: BTreeMap<String, Resolution<'a>>,
    pub marks: &'a [CourseMark],
    /// The course boundary with its first vertex repeated at the end.
    pub boundary_polygon: Vec<Position>,
}

/// Assemble tracks and current positions for `selected_boats`.
///
/// Boats that are selected but have no samples in the view (unknown, or
/// everything filtered out) are left out of both maps; `NotYetStarted` only
/// ever means the query time is before the boat's first sample.
pub fn assemble<'a>(
    view: &'a FilteredView<'a>,
    selected_boats: &[String],
    query_time: DateTime<Utc>,
    course: &'a RaceCourse,
) -> Assembly<'a> {
    let mut tracks = BTreeMap::new();
    let mut positions = BTreeMap::new();

    for boat in selected_boats {
        let Some(samples) = view.track(boat).map(|t| t.samples.as_slice()) else {
            tracing::debug!("Boat {} has no samples in the view", boat);
            continue;
        };

        let path: Vec<Position> = samples.iter().filter_map(|s| s.position).collect();
        tracks.insert(boat.clone(), path);
        positions.insert(boat.clone(), resolve(samples, query_time));
    }

    Assembly {
        query_time,
        tracks,
        positions,
        marks: &course.marks,
        boundary_polygon: course.boundary.closed(),
    }
}
