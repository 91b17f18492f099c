//! Wall-clock position tracking for the current track
//!
//! The media server only reports a coarse transport state, so elapsed time is
//! derived locally: accumulated time from earlier play spans plus the length
//! of the span in progress. Pause freezes the accumulated value.

use std::time::{Duration, Instant};
use tracing::debug;
use tunebox_common::models::{ObservedTrack, TrackState};

#[derive(Debug, Default)]
pub struct PositionTracker {
    /// Title currently being tracked
    track_name: Option<String>,
    /// Elapsed time banked from completed play spans
    accumulated: Duration,
    /// Start of the play span in progress; None while paused or stopped
    playing_since: Option<Instant>,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin (or continue) timing `name`
    ///
    /// Accumulated time carries over only when `name` is the title already
    /// tracked; a different title starts from zero.
    pub fn start(&mut self, name: &str) {
        if self.track_name.as_deref() != Some(name) {
            self.accumulated = Duration::ZERO;
            self.track_name = Some(name.to_string());
        } else if let Some(since) = self.playing_since.take() {
            self.accumulated += since.elapsed();
        }
        self.playing_since = Some(Instant::now());
        debug!("Tracking position of {}", name);
    }

    pub fn pause(&mut self) {
        if let Some(since) = self.playing_since.take() {
            self.accumulated += since.elapsed();
        }
    }

    pub fn resume(&mut self) {
        if self.track_name.is_some() && self.playing_since.is_none() {
            self.playing_since = Some(Instant::now());
        }
    }

    /// Forget the tracked title and its elapsed time
    pub fn stop(&mut self) {
        self.track_name = None;
        self.accumulated = Duration::ZERO;
        self.playing_since = None;
    }

    pub fn reset(&mut self) {
        self.stop();
    }

    /// Elapsed play time of `name`; zero if another title (or nothing) is tracked
    pub fn get_elapsed_time(&self, name: &str) -> Duration {
        if self.track_name.as_deref() != Some(name) {
            return Duration::ZERO;
        }
        match self.playing_since {
            Some(since) => self.accumulated + since.elapsed(),
            None => self.accumulated,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing_since.is_some()
    }

    pub fn track_name(&self) -> Option<&str> {
        self.track_name.as_deref()
    }

    /// Reconcile with what the device reports
    ///
    /// A different title restarts tracking from zero; `paused` pauses and
    /// `playing` resumes. Any other state leaves the play flag alone.
    pub fn update(&mut self, observed: &ObservedTrack) {
        if self.track_name.as_deref() != Some(observed.title.as_str()) {
            self.stop();
            self.start(&observed.title);
        }

        match observed.track_state {
            TrackState::Paused => self.pause(),
            TrackState::Playing => self.resume(),
            _ => {}
        }
    }
}
