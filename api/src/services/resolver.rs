//! Point-in-time resolution: a boat's last known sample as of a query time.
//!
//! Never interpolates and never looks past the query time.

use chrono::{DateTime, Utc};

use crate::models::Sample;

/// Outcome of resolving a boat's state at a query time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution<'a> {
    /// The last sample with `timestamp <= query time`.
    At(&'a Sample),
    /// The query time is before the boat's first sample.
    NotYetStarted,
}

impl<'a> Resolution<'a> {
    pub fn sample(&self) -> Option<&'a Sample> {
        match *self {
            Resolution::At(s) => Some(s),
            Resolution::NotYetStarted => None,
        }
    }
}

/// Resolve the last sample at or before `at` in a timestamp-sorted sequence.
///
/// Binary search; with duplicate timestamps the last of the tied run wins.
pub fn resolve<S: AsRef<Sample>>(samples: &[S], at: DateTime<Utc>) -> Resolution<'_> {
    let after = samples.partition_point(|s| s.as_ref().timestamp <= at);
    match after.checked_sub(1) {
        Some(i) => Resolution::At(samples[i].as_ref()),
        None => Resolution::NotYetStarted,
    }
}
