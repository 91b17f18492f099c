//! Data models shared between the queue, the playback driver and the API
//!
//! Media-server records (`Track`, `Player`, `Session`) are normalised here so
//! the rest of the system never sees the remote server's wire format.

use serde::{Deserialize, Deserializer, Serialize};

/// Artist name used when the media server does not report one
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Convert a millisecond duration to whole seconds (truncating)
pub fn milliseconds_to_seconds(milliseconds: u64) -> u64 {
    milliseconds / 1000
}

// ============================================================================
// Queue
// ============================================================================

/// One pending track in the play queue
///
/// Immutable once enqueued. Identity is `item_id`; two entries with the same
/// id never coexist in a queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredQueueEntry")]
pub struct QueueEntry {
    /// Opaque track id from the media server
    pub item_id: String,
    pub title: String,
    pub artist: String,
    /// Track length in seconds
    pub duration: u64,
    /// Artwork path on the media server
    pub album_art: Option<String>,
}

impl QueueEntry {
    /// Build a queue entry from a resolved media-server track
    pub fn from_track(track: &Track) -> Self {
        Self {
            item_id: track.id.clone(),
            title: track.title.clone(),
            artist: track
                .artist
                .clone()
                .unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            duration: track.duration_secs(),
            album_art: track.thumb.clone(),
        }
    }
}

/// Lenient on-disk form of a queue entry; optional fields fall back to defaults
#[derive(Deserialize)]
struct StoredQueueEntry {
    #[serde(deserialize_with = "id_from_string_or_number")]
    item_id: String,
    title: String,
    #[serde(default)]
    artist: Option<String>,
    #[serde(default)]
    duration: Option<u64>,
    #[serde(default)]
    album_art: Option<String>,
}

impl From<StoredQueueEntry> for QueueEntry {
    fn from(stored: StoredQueueEntry) -> Self {
        Self {
            item_id: stored.item_id,
            title: stored.title,
            artist: stored.artist.unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            duration: stored.duration.unwrap_or(0),
            album_art: stored.album_art,
        }
    }
}

/// Older queue payloads carry numeric ids
fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

// ============================================================================
// Media server records
// ============================================================================

/// A library item resolved by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    /// Media-server item type ("track", "album", "artist", ...)
    pub kind: String,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration_ms: Option<u64>,
    pub thumb: Option<String>,
}

impl Track {
    /// Only audio tracks can be queued
    pub fn is_track(&self) -> bool {
        self.kind == "track"
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_ms.map(milliseconds_to_seconds).unwrap_or(0)
    }
}

/// An output device known to the media server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub player_id: String,
    pub name: String,
    pub device: String,
}

/// Transport state reported by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackState {
    Playing,
    Paused,
    Buffering,
    Stopped,
    #[serde(other)]
    Unknown,
}

impl From<&str> for TrackState {
    fn from(s: &str) -> Self {
        match s {
            "playing" => TrackState::Playing,
            "paused" => TrackState::Paused,
            "buffering" => TrackState::Buffering,
            "stopped" => TrackState::Stopped,
            _ => TrackState::Unknown,
        }
    }
}

/// An active playback session polled from the media server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration_ms: u64,
    pub view_offset_ms: u64,
    /// Machine identifier of the device playing this session
    pub player_id: String,
    pub state: TrackState,
}

/// Externally observed track, used to reconcile the position tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedTrack {
    pub title: String,
    pub track_state: TrackState,
}

/// Snapshot of what the active device is playing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowPlaying {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub track_state: TrackState,
    /// Seconds
    pub total_time: u64,
    pub elapsed_time: f64,
    pub remaining_time: f64,
    pub remaining_percentage: f64,
}

// ============================================================================
// Library browsing
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistSummary {
    pub artist_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumSummary {
    pub album_id: String,
    pub artist: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub track_id: String,
    pub title: String,
    /// Seconds
    pub duration: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumTracks {
    pub album_title: String,
    pub tracks: Vec<TrackSummary>,
}

/// One search result, tagged with its library type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SearchHit {
    Artist {
        name: String,
        artist_id: String,
    },
    Album {
        title: String,
        album_id: String,
        artist: Option<String>,
    },
    Track {
        title: String,
        track_id: String,
        duration: u64,
        artist: Option<String>,
        album: Option<String>,
    },
}

/// Binary artwork proxied from the media server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artwork {
    pub content_type: String,
    pub bytes: Vec<u8>,
}
