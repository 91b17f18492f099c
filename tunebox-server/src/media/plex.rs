//! Plex Media Server client
//!
//! Talks to the Plex HTTP API in JSON mode. Device commands (play/stop) are
//! proxied through the server to the target client identified by
//! `X-Plex-Target-Client-Identifier`.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use tunebox_common::config::Settings;
use tunebox_common::models::{
    milliseconds_to_seconds, AlbumSummary, AlbumTracks, ArtistSummary, Artwork, Player,
    SearchHit, Session, Track, TrackState, TrackSummary,
};
use tunebox_common::{Error, Result};

use super::{check_item_id, MediaServer};

const PRODUCT: &str = "TuneBox";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// Plex library type ids
const TYPE_ARTIST: &str = "8";
const TYPE_ALBUM: &str = "9";
const TYPE_TRACK: &str = "10";

// ============================================================================
// Wire format
// ============================================================================

#[derive(Deserialize, Debug)]
struct PlexResponse {
    #[serde(rename = "MediaContainer")]
    media_container: MediaContainer,
}

#[derive(Deserialize, Debug, Default)]
struct MediaContainer {
    #[serde(rename = "machineIdentifier")]
    machine_identifier: Option<String>,
    #[serde(rename = "playQueueID")]
    play_queue_id: Option<u64>,
    #[serde(rename = "Metadata", default)]
    metadata: Vec<PlexMetadata>,
    #[serde(rename = "Directory", default)]
    directories: Vec<PlexDirectory>,
    #[serde(rename = "Server", default)]
    servers: Vec<PlexClientDevice>,
}

#[derive(Deserialize, Debug)]
struct PlexMetadata {
    #[serde(rename = "ratingKey")]
    rating_key: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    title: String,
    #[serde(rename = "parentTitle")]
    parent_title: Option<String>,
    #[serde(rename = "grandparentTitle")]
    grandparent_title: Option<String>,
    duration: Option<u64>,
    #[serde(rename = "viewOffset")]
    view_offset: Option<u64>,
    thumb: Option<String>,
    #[serde(rename = "Player")]
    player: Option<PlexSessionPlayer>,
}

#[derive(Deserialize, Debug)]
struct PlexSessionPlayer {
    #[serde(rename = "machineIdentifier")]
    machine_identifier: String,
    #[serde(default)]
    state: String,
}

#[derive(Deserialize, Debug)]
struct PlexDirectory {
    key: String,
    #[serde(rename = "type")]
    section_type: String,
    title: String,
}

#[derive(Deserialize, Debug)]
struct PlexClientDevice {
    name: String,
    #[serde(rename = "machineIdentifier")]
    machine_identifier: String,
    device: Option<String>,
    product: Option<String>,
}

impl From<PlexMetadata> for Track {
    fn from(m: PlexMetadata) -> Self {
        Track {
            id: m.rating_key,
            kind: m.kind,
            title: m.title,
            artist: m.grandparent_title,
            album: m.parent_title,
            duration_ms: m.duration,
            thumb: m.thumb,
        }
    }
}

impl From<PlexClientDevice> for Player {
    fn from(d: PlexClientDevice) -> Self {
        Player {
            player_id: d.machine_identifier,
            name: d.name,
            device: d.device.or(d.product).unwrap_or_default(),
        }
    }
}

fn session_from(m: PlexMetadata) -> Option<Session> {
    let player = m.player?;
    Some(Session {
        title: m.title,
        artist: m.grandparent_title,
        album: m.parent_title,
        duration_ms: m.duration.unwrap_or(0),
        view_offset_ms: m.view_offset.unwrap_or(0),
        player_id: player.machine_identifier,
        state: TrackState::from(player.state.as_str()),
    })
}

fn search_hit_from(m: PlexMetadata) -> Option<SearchHit> {
    match m.kind.as_str() {
        "artist" => Some(SearchHit::Artist {
            name: m.title,
            artist_id: m.rating_key,
        }),
        "album" => Some(SearchHit::Album {
            title: m.title,
            album_id: m.rating_key,
            artist: m.parent_title,
        }),
        "track" => Some(SearchHit::Track {
            title: m.title,
            track_id: m.rating_key,
            duration: m.duration.map(milliseconds_to_seconds).unwrap_or(0),
            artist: m.grandparent_title,
            album: m.parent_title,
        }),
        other => {
            debug!("Ignoring search result of type {}", other);
            None
        }
    }
}

fn media_error(e: reqwest::Error) -> Error {
    Error::MediaServer(e.to_string())
}

// ============================================================================
// Client
// ============================================================================

/// Plex implementation of [`MediaServer`]
pub struct PlexClient {
    http: Client,
    base_url: Url,
    library_section: String,
    client_identifier: String,
    /// Monotonic id attached to every device command
    command_id: AtomicU64,
    section_key: OnceCell<String>,
    server_identifier: OnceCell<String>,
}

impl PlexClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let base_url = Url::parse(&settings.plex_base_url).map_err(|e| {
            Error::Config(format!("Invalid plex_base_url {}: {}", settings.plex_base_url, e))
        })?;
        let client_identifier = uuid::Uuid::new_v4().to_string();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-plex-token",
            HeaderValue::from_str(&settings.plex_token)
                .map_err(|e| Error::Config(format!("Invalid plex_token: {}", e)))?,
        );
        headers.insert("x-plex-product", HeaderValue::from_static(PRODUCT));
        headers.insert(
            "x-plex-version",
            HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
        );
        headers.insert(
            "x-plex-client-identifier",
            HeaderValue::from_str(&client_identifier)
                .map_err(|e| Error::Internal(e.to_string()))?,
        );

        let http = Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(media_error)?;

        info!("Plex client configured for {}", base_url);
        Ok(Self {
            http,
            base_url,
            library_section: settings.library_section.clone(),
            client_identifier,
            command_id: AtomicU64::new(0),
            section_key: OnceCell::new(),
            server_identifier: OnceCell::new(),
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Internal(format!("Invalid Plex path {}: {}", path, e)))
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let response = request.send().await.map_err(media_error)?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::NotFound(format!("{} not found", what))),
            status if !status.is_success() => Err(Error::MediaServer(format!(
                "{} request failed with status {}",
                what, status
            ))),
            _ => Ok(response),
        }
    }

    async fn get_container(
        &self,
        path: &str,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<MediaContainer> {
        let request = self.http.get(self.url(path)?).query(query);
        let response = self.send(request, what).await?;
        Ok(decode::<PlexResponse>(response).await?.media_container)
    }

    async fn metadata(&self, item_id: &str) -> Result<PlexMetadata> {
        check_item_id(item_id)?;
        let what = format!("Item {}", item_id);
        self.get_container(&format!("/library/metadata/{}", item_id), &[], &what)
            .await?
            .metadata
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("{} not found", what)))
    }

    async fn children(&self, item_id: &str) -> Result<Vec<PlexMetadata>> {
        check_item_id(item_id)?;
        Ok(self
            .get_container(
                &format!("/library/metadata/{}/children", item_id),
                &[],
                &format!("Children of {}", item_id),
            )
            .await?
            .metadata)
    }

    /// Key of the music library section, looked up once
    async fn section_key(&self) -> Result<&str> {
        self.section_key
            .get_or_try_init(|| async {
                let directories = self
                    .get_container("/library/sections", &[], "Library sections")
                    .await?
                    .directories;

                let section = directories
                    .iter()
                    .find(|d| d.title == self.library_section)
                    .or_else(|| directories.iter().find(|d| d.section_type == "artist"))
                    .ok_or_else(|| {
                        Error::MediaServer(format!(
                            "No music library section '{}' found",
                            self.library_section
                        ))
                    })?;

                info!("Using music library '{}' (key {})", section.title, section.key);
                Ok::<_, Error>(section.key.clone())
            })
            .await
            .map(String::as_str)
    }

    async fn server_identifier(&self) -> Result<&str> {
        self.server_identifier
            .get_or_try_init(|| async {
                self.get_container("/", &[], "Server identity")
                    .await?
                    .machine_identifier
                    .ok_or_else(|| {
                        Error::MediaServer("Server did not report a machineIdentifier".to_string())
                    })
            })
            .await
            .map(String::as_str)
    }

    async fn search_type(&self, section: &str, kind: &str, query: &str) -> Result<Vec<SearchHit>> {
        Ok(self
            .get_container(
                &format!("/library/sections/{}/search", section),
                &[("type", kind), ("query", query)],
                "Search",
            )
            .await?
            .metadata
            .into_iter()
            .filter_map(search_hit_from)
            .collect())
    }

    fn next_command_id(&self) -> String {
        (self.command_id.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }

    fn player_command(&self, player: &Player, command: &str) -> Result<RequestBuilder> {
        Ok(self
            .http
            .get(self.url(&format!("/player/playback/{}", command))?)
            .header("X-Plex-Target-Client-Identifier", &player.player_id))
    }

    async fn create_play_queue(&self, track: &Track) -> Result<u64> {
        let server = self.server_identifier().await?;
        let uri = format!(
            "server://{}/com.plexapp.plugins.library/library/metadata/{}",
            server, track.id
        );
        let request = self.http.post(self.url("/playQueues")?).query(&[
            ("type", "audio"),
            ("uri", uri.as_str()),
            ("shuffle", "0"),
            ("repeat", "0"),
            ("continuous", "0"),
        ]);
        let response = self.send(request, "Play queue").await?;
        decode::<PlexResponse>(response)
            .await?
            .media_container
            .play_queue_id
            .ok_or_else(|| Error::MediaServer("Play queue response has no id".to_string()))
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    response.json::<T>().await.map_err(media_error)
}

#[async_trait]
impl MediaServer for PlexClient {
    async fn players(&self) -> Result<Vec<Player>> {
        let players: Vec<Player> = self
            .get_container("/clients", &[], "Clients")
            .await?
            .servers
            .into_iter()
            .map(Player::from)
            .collect();
        debug!("Plex reports {} players", players.len());
        Ok(players)
    }

    async fn track(&self, item_id: &str) -> Result<Track> {
        debug!("Fetching track: {}", item_id);
        let track = Track::from(self.metadata(item_id).await?);
        debug!("Fetched track: {}", track.title);
        Ok(track)
    }

    async fn play(&self, player: &Player, track: &Track) -> Result<()> {
        info!("Attempting to play {} on {}", track.title, player.name);

        let play_queue_id = self.create_play_queue(track).await?;
        let server = self.server_identifier().await?;
        let key = format!("/library/metadata/{}", track.id);
        let container_key = format!("/playQueues/{}?window=100&own=1", play_queue_id);
        let address = self.base_url.host_str().unwrap_or_default().to_string();
        let port = self
            .base_url
            .port_or_known_default()
            .unwrap_or(32400)
            .to_string();
        let command_id = self.next_command_id();

        let request = self.player_command(player, "playMedia")?.query(&[
            ("key", key.as_str()),
            ("offset", "0"),
            ("type", "music"),
            ("machineIdentifier", server),
            ("address", address.as_str()),
            ("port", port.as_str()),
            ("protocol", self.base_url.scheme()),
            ("containerKey", container_key.as_str()),
            ("commandID", command_id.as_str()),
        ]);
        self.send(request, &format!("Player {}", player.name)).await?;

        info!("{} started playing on {}", track.title, player.name);
        Ok(())
    }

    async fn stop(&self, player: &Player) -> Result<()> {
        info!("Stopping playback on {}", player.name);
        let command_id = self.next_command_id();
        let request = self
            .player_command(player, "stop")?
            .query(&[("type", "music"), ("commandID", command_id.as_str())]);
        self.send(request, &format!("Player {}", player.name)).await?;
        Ok(())
    }

    async fn sessions(&self) -> Result<Vec<Session>> {
        let sessions: Vec<Session> = self
            .get_container("/status/sessions", &[], "Sessions")
            .await?
            .metadata
            .into_iter()
            .filter_map(session_from)
            .collect();
        debug!("Plex sessions: {}", sessions.len());
        Ok(sessions)
    }

    async fn artists(&self) -> Result<Vec<ArtistSummary>> {
        let section = self.section_key().await?;
        Ok(self
            .get_container(
                &format!("/library/sections/{}/all", section),
                &[("type", TYPE_ARTIST)],
                "Artists",
            )
            .await?
            .metadata
            .into_iter()
            .map(|m| ArtistSummary {
                artist_id: m.rating_key,
                name: m.title,
            })
            .collect())
    }

    async fn albums_for_artist(&self, artist_id: &str) -> Result<Vec<AlbumSummary>> {
        let artist = self.metadata(artist_id).await?;
        Ok(self
            .children(artist_id)
            .await?
            .into_iter()
            .map(|m| AlbumSummary {
                album_id: m.rating_key,
                artist: m.parent_title.unwrap_or_else(|| artist.title.clone()),
                title: m.title,
            })
            .collect())
    }

    async fn album_tracks(&self, album_id: &str) -> Result<AlbumTracks> {
        let album = self.metadata(album_id).await?;
        let tracks = self
            .children(album_id)
            .await?
            .into_iter()
            .map(|m| TrackSummary {
                track_id: m.rating_key,
                title: m.title,
                duration: m.duration.map(milliseconds_to_seconds).unwrap_or(0),
            })
            .collect();
        Ok(AlbumTracks {
            album_title: album.title,
            tracks,
        })
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let section = self.section_key().await?;
        let mut hits = Vec::new();
        for kind in [TYPE_ARTIST, TYPE_ALBUM, TYPE_TRACK] {
            hits.extend(self.search_type(section, kind, query).await?);
        }
        Ok(hits)
    }

    async fn artwork(&self, item_id: &str) -> Result<Artwork> {
        let item = self.metadata(item_id).await?;
        let thumb = item
            .thumb
            .ok_or_else(|| Error::NotFound(format!("No image available for item {}", item_id)))?;

        let response = self
            .send(self.http.get(self.url(&thumb)?), &format!("Image for {}", item_id))
            .await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        let bytes = response.bytes().await.map_err(media_error)?.to_vec();
        if bytes.is_empty() {
            warn!("Empty image returned for item {}", item_id);
        }

        Ok(Artwork {
            content_type,
            bytes,
        })
    }
}

impl std::fmt::Debug for PlexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlexClient")
            .field("base_url", &self.base_url.as_str())
            .field("library_section", &self.library_section)
            .field("client_identifier", &self.client_identifier)
            .finish()
    }
}
