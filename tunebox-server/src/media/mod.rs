//! Media server boundary
//!
//! Everything TuneBox needs from the remote media server goes through
//! [`MediaServer`]. The production implementation talks to Plex; tests
//! substitute an in-process fake.

pub mod plex;

use async_trait::async_trait;
use tunebox_common::models::{
    AlbumSummary, AlbumTracks, ArtistSummary, Artwork, Player, SearchHit, Session, Track,
};
use tunebox_common::{Error, Result};

pub use plex::PlexClient;

/// Library item ids are numeric; anything else is rejected before it can
/// reach a media-server URL
pub fn check_item_id(item_id: &str) -> Result<()> {
    if item_id.is_empty() || !item_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidInput(format!(
            "Invalid item id: {:?}",
            item_id
        )));
    }
    Ok(())
}

/// Remote library and device control
///
/// Transport failures surface as `Error::MediaServer`; an unknown item id is
/// `Error::NotFound`.
#[async_trait]
pub trait MediaServer: Send + Sync {
    /// Output devices currently known to the server
    async fn players(&self) -> Result<Vec<Player>>;

    /// Resolve an item id to its full record
    async fn track(&self, item_id: &str) -> Result<Track>;

    /// Start playing `track` on `player`
    async fn play(&self, player: &Player, track: &Track) -> Result<()>;

    /// Stop audio playback on `player`
    async fn stop(&self, player: &Player) -> Result<()>;

    /// Active playback sessions across all devices
    async fn sessions(&self) -> Result<Vec<Session>>;

    async fn artists(&self) -> Result<Vec<ArtistSummary>>;

    async fn albums_for_artist(&self, artist_id: &str) -> Result<Vec<AlbumSummary>>;

    async fn album_tracks(&self, album_id: &str) -> Result<AlbumTracks>;

    /// Artists, albums and tracks matching `query`, in that order
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;

    /// Thumbnail image of an artist or album
    async fn artwork(&self, item_id: &str) -> Result<Artwork>;
}
