//! What the active device is playing right now

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tunebox_common::models::{
    milliseconds_to_seconds, NowPlaying, ObservedTrack, Session, UNKNOWN_ARTIST,
};
use tunebox_common::Result;

use super::player::resolve_active_player;
use super::SharedTracker;
use crate::media::MediaServer;

pub struct NowPlayingService {
    media: Arc<dyn MediaServer>,
    tracker: SharedTracker,
    client_name: Option<String>,
}

impl NowPlayingService {
    pub fn new(media: Arc<dyn MediaServer>, tracker: SharedTracker, client_name: Option<String>) -> Self {
        Self {
            media,
            tracker,
            client_name,
        }
    }

    /// Snapshot of the active device's session, or None if it has none
    ///
    /// Polling also reconciles the position tracker with the observed title
    /// and transport state.
    pub async fn current_playing(&self) -> Result<Option<NowPlaying>> {
        let player =
            resolve_active_player(self.media.as_ref(), self.client_name.as_deref()).await?;
        let sessions = self.media.sessions().await?;

        let Some(session) = sessions
            .into_iter()
            .find(|s| s.player_id == player.player_id)
        else {
            debug!("No session on active player {}", player.name);
            return Ok(None);
        };

        let elapsed = {
            let mut tracker = self.tracker.lock().await;
            tracker.update(&ObservedTrack {
                title: session.title.clone(),
                track_state: session.state,
            });
            tracker.get_elapsed_time(&session.title)
        };

        let now_playing = snapshot(session, elapsed);
        debug!("Current track: {:?}", now_playing);
        Ok(Some(now_playing))
    }
}

/// Derive client-facing times from a session and the tracked elapsed time
pub fn snapshot(session: Session, elapsed: Duration) -> NowPlaying {
    let total_time = milliseconds_to_seconds(session.duration_ms);
    let total = total_time as f64;
    let elapsed_time = elapsed.as_secs_f64().clamp(0.0, total);
    let remaining_time = total - elapsed_time;
    let remaining_percentage = if total_time > 0 {
        remaining_time / total * 100.0
    } else {
        0.0
    };

    NowPlaying {
        title: session.title,
        artist: session
            .artist
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
        album: session.album,
        track_state: session.state,
        total_time,
        elapsed_time,
        remaining_time,
        remaining_percentage,
    }
}
