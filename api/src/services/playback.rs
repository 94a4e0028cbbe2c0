//! Scrub-time playback.
//!
//! The caller owns a [`PlaybackState`]; every control is a pure transition
//! that takes the state by value and returns the next one.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Default simulated time advanced per tick.
pub const DEFAULT_STEP_SECS: i64 = 10;

/// Current scrub time and whether it is auto-advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PlaybackState {
    pub current_time: DateTime<Utc>,
    pub playing: bool,
}

impl PlaybackState {
    pub fn paused_at(current_time: DateTime<Utc>) -> Self {
        Self {
            current_time,
            playing: false,
        }
    }
}

/// Bounds and step for one dataset's playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackClock {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub step: Duration,
}

impl PlaybackClock {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, step: Duration) -> Self {
        Self { start, end, step }
    }

    /// Advance one step while playing; clamp to the end and stop there.
    pub fn tick(&self, state: PlaybackState) -> PlaybackState {
        if !state.playing {
            return state;
        }
        if state.current_time >= self.end {
            return PlaybackState::paused_at(self.end);
        }
        let next = state.current_time + self.step;
        if next > self.end {
            tracing::debug!("Playback reached the end at {}", self.end);
            PlaybackState::paused_at(self.end)
        } else {
            PlaybackState {
                current_time: next,
                playing: true,
            }
        }
    }

    /// Flip play/pause. Starting from the end does not restart; it stays paused.
    pub fn toggle(&self, state: PlaybackState) -> PlaybackState {
        PlaybackState {
            current_time: state.current_time,
            playing: !state.playing && state.current_time < self.end,
        }
    }

    /// Jump to `to`, clamped into the clock's bounds. Play state is kept.
    pub fn seek(&self, state: PlaybackState, to: DateTime<Utc>) -> PlaybackState {
        PlaybackState {
            current_time: to.clamp(self.start, self.end),
            playing: state.playing,
        }
    }
}
