//! Test helpers for tunebox-server integration tests
//!
//! Provides an in-process media server fake and a context builder backed by
//! an in-memory store.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tunebox_common::config::{CliOverrides, Settings, TomlConfig};
use tunebox_common::models::{
    AlbumSummary, AlbumTracks, ArtistSummary, Artwork, Player, SearchHit, Session, Track,
    TrackState, TrackSummary,
};
use tunebox_common::{Error, Result};
use tunebox_server::db::Store;
use tunebox_server::media::MediaServer;
use tunebox_server::AppContext;

/// Poll interval used by drains in tests
pub const TEST_POLL_MS: u64 = 20;

pub fn track(id: &str, title: &str, duration_secs: u64) -> Track {
    Track {
        id: id.to_string(),
        kind: "track".to_string(),
        title: title.to_string(),
        artist: Some("Test Artist".to_string()),
        album: Some("Test Album".to_string()),
        duration_ms: Some(duration_secs * 1000),
        thumb: Some(format!("/library/metadata/{}/thumb", id)),
    }
}

pub fn player(id: &str, name: &str) -> Player {
    Player {
        player_id: id.to_string(),
        name: name.to_string(),
        device: "Test Device".to_string(),
    }
}

/// Scriptable media server
pub struct FakeMediaServer {
    tracks: Mutex<HashMap<String, Track>>,
    players: Mutex<Vec<Player>>,
    sessions: Mutex<Vec<Session>>,
    played: Mutex<Vec<(String, String)>>,
    failing_plays: Mutex<HashSet<String>>,
    stops: AtomicUsize,
    artist_calls: AtomicUsize,
    unavailable: Mutex<bool>,
    play_delay: Mutex<Duration>,
    plays_in_flight: AtomicUsize,
    max_plays_in_flight: AtomicUsize,
}

impl FakeMediaServer {
    /// One player named "Living Room"
    pub fn new() -> Self {
        Self {
            tracks: Mutex::new(HashMap::new()),
            players: Mutex::new(vec![player("player-1", "Living Room")]),
            sessions: Mutex::new(Vec::new()),
            played: Mutex::new(Vec::new()),
            failing_plays: Mutex::new(HashSet::new()),
            stops: AtomicUsize::new(0),
            artist_calls: AtomicUsize::new(0),
            unavailable: Mutex::new(false),
            play_delay: Mutex::new(Duration::ZERO),
            plays_in_flight: AtomicUsize::new(0),
            max_plays_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn add_track(&self, track: Track) {
        self.tracks.lock().unwrap().insert(track.id.clone(), track);
    }

    pub fn set_players(&self, players: Vec<Player>) {
        *self.players.lock().unwrap() = players;
    }

    pub fn set_sessions(&self, sessions: Vec<Session>) {
        *self.sessions.lock().unwrap() = sessions;
    }

    /// Make `play` fail for this track id
    pub fn fail_play_of(&self, item_id: &str) {
        self.failing_plays.lock().unwrap().insert(item_id.to_string());
    }

    /// Every call fails with a media-server error
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    /// Track ids passed to `play`, in call order
    pub fn played(&self) -> Vec<String> {
        self.played
            .lock()
            .unwrap()
            .iter()
            .map(|(_, track_id)| track_id.clone())
            .collect()
    }

    /// Player ids passed to `play`, in call order
    pub fn played_on(&self) -> Vec<String> {
        self.played
            .lock()
            .unwrap()
            .iter()
            .map(|(player_id, _)| player_id.clone())
            .collect()
    }

    /// How long each `play` call takes to return
    pub fn set_play_delay(&self, delay: Duration) {
        *self.play_delay.lock().unwrap() = delay;
    }

    /// Highest number of `play` calls observed running at once
    pub fn max_plays_in_flight(&self) -> usize {
        self.max_plays_in_flight.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn artist_calls(&self) -> usize {
        self.artist_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if *self.unavailable.lock().unwrap() {
            return Err(Error::MediaServer("connection refused".to_string()));
        }
        Ok(())
    }

    fn lookup(&self, item_id: &str) -> Result<Track> {
        self.check_available()?;
        self.tracks
            .lock()
            .unwrap()
            .get(item_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Item {} not found", item_id)))
    }
}

#[async_trait]
impl MediaServer for FakeMediaServer {
    async fn players(&self) -> Result<Vec<Player>> {
        self.check_available()?;
        Ok(self.players.lock().unwrap().clone())
    }

    async fn track(&self, item_id: &str) -> Result<Track> {
        self.lookup(item_id)
    }

    async fn play(&self, player: &Player, track: &Track) -> Result<()> {
        self.check_available()?;
        if self.failing_plays.lock().unwrap().contains(&track.id) {
            return Err(Error::MediaServer(format!("play of {} rejected", track.id)));
        }

        let in_flight = self.plays_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_plays_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        let delay = *self.play_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.plays_in_flight.fetch_sub(1, Ordering::SeqCst);

        self.played
            .lock()
            .unwrap()
            .push((player.player_id.clone(), track.id.clone()));
        Ok(())
    }

    async fn stop(&self, _player: &Player) -> Result<()> {
        self.check_available()?;
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn sessions(&self) -> Result<Vec<Session>> {
        self.check_available()?;
        Ok(self.sessions.lock().unwrap().clone())
    }

    async fn artists(&self) -> Result<Vec<ArtistSummary>> {
        self.check_available()?;
        self.artist_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![ArtistSummary {
            artist_id: "100".to_string(),
            name: "Test Artist".to_string(),
        }])
    }

    async fn albums_for_artist(&self, artist_id: &str) -> Result<Vec<AlbumSummary>> {
        self.check_available()?;
        Ok(vec![AlbumSummary {
            album_id: "200".to_string(),
            artist: format!("Artist {}", artist_id),
            title: "Test Album".to_string(),
        }])
    }

    async fn album_tracks(&self, album_id: &str) -> Result<AlbumTracks> {
        self.check_available()?;
        let tracks = self
            .tracks
            .lock()
            .unwrap()
            .values()
            .map(|t| TrackSummary {
                track_id: t.id.clone(),
                title: t.title.clone(),
                duration: t.duration_secs(),
            })
            .collect();
        Ok(AlbumTracks {
            album_title: format!("Album {}", album_id),
            tracks,
        })
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.check_available()?;
        let query = query.to_lowercase();
        Ok(self
            .tracks
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.title.to_lowercase().contains(&query))
            .map(|t| SearchHit::Track {
                title: t.title.clone(),
                track_id: t.id.clone(),
                duration: t.duration_secs(),
                artist: t.artist.clone(),
                album: t.album.clone(),
            })
            .collect())
    }

    async fn artwork(&self, item_id: &str) -> Result<Artwork> {
        let item = self.lookup(item_id)?;
        match item.thumb {
            Some(_) => Ok(Artwork {
                content_type: "image/png".to_string(),
                bytes: vec![0x89, b'P', b'N', b'G'],
            }),
            None => Err(Error::NotFound(format!("No image available for item {}", item_id))),
        }
    }
}

/// A session on `player_id` playing `title`
pub fn session(player_id: &str, title: &str, duration_secs: u64, state: TrackState) -> Session {
    Session {
        title: title.to_string(),
        artist: Some("Test Artist".to_string()),
        album: Some("Test Album".to_string()),
        duration_ms: duration_secs * 1000,
        view_offset_ms: 0,
        player_id: player_id.to_string(),
        state,
    }
}

/// Settings suitable for tests (short poll interval, no preferred player)
pub fn test_settings(client_name: Option<&str>) -> Settings {
    let cli = CliOverrides {
        plex_base_url: Some("http://127.0.0.1:32400".to_string()),
        plex_token: Some("test-token".to_string()),
        client_name: client_name.map(str::to_string),
        ..Default::default()
    };
    let toml = TomlConfig {
        poll_interval_ms: Some(TEST_POLL_MS),
        update_interval_secs: Some(1),
        cache_ttl_secs: Some(60),
        ..Default::default()
    };
    Settings::from_sources(cli, toml).unwrap()
}

/// Context over an in-memory store and the given fake
pub async fn test_context(media: Arc<FakeMediaServer>) -> AppContext {
    test_context_with(media, test_settings(None)).await
}

pub async fn test_context_with(media: Arc<FakeMediaServer>, settings: Settings) -> AppContext {
    let store = Store::in_memory().await.unwrap();
    AppContext::new(settings, store, media)
}

/// Poll `condition` until it holds or `timeout` passes
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
