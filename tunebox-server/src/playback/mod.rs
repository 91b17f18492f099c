//! Queue draining and position tracking
//!
//! The [`PlaybackDriver`] plays queued tracks one after another on the active
//! device. Position is tracked locally by the [`PositionTracker`], shared with
//! the now-playing snapshot so both agree on elapsed time.

pub mod driver;
pub mod now_playing;
pub mod player;
pub mod queue;
pub mod tracker;

use std::sync::Arc;
use tokio::sync::Mutex;

pub use driver::{DrainOutcome, DriverState, PlaybackDriver};
pub use now_playing::NowPlayingService;
pub use player::resolve_active_player;
pub use queue::QueueStore;
pub use tracker::PositionTracker;

/// Position tracker shared between the driver and now-playing polls
pub type SharedTracker = Arc<Mutex<PositionTracker>>;

pub fn shared_tracker() -> SharedTracker {
    Arc::new(Mutex::new(PositionTracker::new()))
}
