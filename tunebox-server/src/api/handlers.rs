//! HTTP request handlers
//!
//! Queue and playback control plus read-only library browsing under
//! `/api/music`.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{debug, info, warn};
use tunebox_common::models::{
    AlbumSummary, AlbumTracks, ArtistSummary, NowPlaying, Player, QueueEntry, SearchHit,
};
use tunebox_common::Error;

use super::error::ApiResult;
use crate::cache::{albums_for_artist_key, tracks_for_album_key, ALL_ARTISTS_KEY};
use crate::media::check_item_id;
use crate::playback::{resolve_active_player, DriverState};
use crate::state::AppContext;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct PlaybackStatusResponse {
    state: DriverState,
    queue_length: u64,
}

#[derive(Debug, Serialize)]
pub struct NowPlayingResponse {
    current_track: NowPlaying,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    query: String,
}

/// Push a queue snapshot once the response is on its way
fn schedule_queue_push(ctx: &AppContext) {
    let broadcaster = ctx.broadcaster.clone();
    tokio::spawn(async move {
        broadcaster.push_queue().await;
    });
}

/// Serve `key` from the library cache, falling back to `fetch`
///
/// Cache failures are logged and treated as misses.
async fn cached<T, F, Fut>(ctx: &AppContext, key: &str, fetch: F) -> ApiResult<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = tunebox_common::Result<T>>,
{
    match ctx.cache.get::<T>(key).await {
        Ok(Some(value)) => {
            info!("Serving {} from cache", key);
            return Ok(value);
        }
        Ok(None) => {}
        Err(e) => warn!("Cache read failed for {}: {}", key, e),
    }

    let value = fetch().await?;
    if let Err(e) = ctx.cache.set(key, &value).await {
        warn!("Cache write failed for {}: {}", key, e);
    }
    Ok(value)
}

// ============================================================================
// Service
// ============================================================================

/// GET /
pub async fn root() -> Json<MessageResponse> {
    MessageResponse::new("Welcome to TuneBox")
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "tunebox-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Queue
// ============================================================================

/// POST /api/music/queue/:item_id
pub async fn enqueue(
    State(ctx): State<AppContext>,
    Path(item_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    check_item_id(&item_id)?;
    let track = ctx.media.track(&item_id).await?;
    if !track.is_track() {
        return Err(Error::InvalidInput(format!(
            "Item {} is a {}, not a track.",
            item_id, track.kind
        ))
        .into());
    }

    ctx.queue.enqueue(QueueEntry::from_track(&track)).await?;
    schedule_queue_push(&ctx);

    Ok(MessageResponse::new(format!(
        "Added {} to the playback queue.",
        track.title
    )))
}

/// DELETE /api/music/queue/:item_id
pub async fn dequeue(
    State(ctx): State<AppContext>,
    Path(item_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    check_item_id(&item_id)?;
    let removed = ctx.queue.dequeue_by_id(&item_id).await?;
    schedule_queue_push(&ctx);

    Ok(MessageResponse::new(format!(
        "Removed {} from the queue.",
        removed.title
    )))
}

/// GET /api/music/queue
pub async fn list_queue(State(ctx): State<AppContext>) -> ApiResult<Json<Vec<QueueEntry>>> {
    Ok(Json(ctx.queue.list_all().await?))
}

/// POST /api/music/clear-queue
pub async fn clear_queue(State(ctx): State<AppContext>) -> ApiResult<Json<MessageResponse>> {
    ctx.queue.clear().await?;
    schedule_queue_push(&ctx);
    Ok(MessageResponse::new("The queue has been cleared."))
}

// ============================================================================
// Playback
// ============================================================================

/// POST /api/music/play-queue
pub async fn play_queue(State(ctx): State<AppContext>) -> Json<MessageResponse> {
    // Runs detached; failures are logged by the driver task
    ctx.driver.start();
    MessageResponse::new("Playback started in the background.")
}

/// POST /api/music/stop-queue
pub async fn stop_queue(State(ctx): State<AppContext>) -> ApiResult<Json<MessageResponse>> {
    ctx.driver.stop_playback().await?;
    schedule_queue_push(&ctx);
    Ok(MessageResponse::new("Playback stopped successfully."))
}

/// GET /api/music/playback-status
pub async fn playback_status(
    State(ctx): State<AppContext>,
) -> ApiResult<Json<PlaybackStatusResponse>> {
    Ok(Json(PlaybackStatusResponse {
        state: ctx.driver.state(),
        queue_length: ctx.queue.len().await?,
    }))
}

// ============================================================================
// Devices
// ============================================================================

/// GET /api/music/players
pub async fn list_players(State(ctx): State<AppContext>) -> ApiResult<Json<Vec<Player>>> {
    let players = ctx.media.players().await?;
    if players.is_empty() {
        return Err(Error::NoPlayersFound.into());
    }
    Ok(Json(players))
}

/// GET /api/music/active-player
pub async fn active_player(State(ctx): State<AppContext>) -> ApiResult<Json<Player>> {
    let player =
        resolve_active_player(ctx.media.as_ref(), ctx.settings.client_name.as_deref()).await?;
    Ok(Json(player))
}

/// GET /api/music/now-playing
pub async fn now_playing(State(ctx): State<AppContext>) -> ApiResult<Json<NowPlayingResponse>> {
    match ctx.now_playing.current_playing().await? {
        Some(current_track) => Ok(Json(NowPlayingResponse { current_track })),
        None => Err(Error::NotFound("No track is currently playing".to_string()).into()),
    }
}

// ============================================================================
// Library
// ============================================================================

/// GET /api/music/artists
pub async fn list_artists(State(ctx): State<AppContext>) -> ApiResult<Json<Vec<ArtistSummary>>> {
    let media = ctx.media.clone();
    let artists = cached(&ctx, ALL_ARTISTS_KEY, || async move { media.artists().await }).await?;
    Ok(Json(artists))
}

/// GET /api/music/artists/:artist_id/albums
pub async fn albums_for_artist(
    State(ctx): State<AppContext>,
    Path(artist_id): Path<String>,
) -> ApiResult<Json<Vec<AlbumSummary>>> {
    check_item_id(&artist_id)?;
    let media = ctx.media.clone();
    let key = albums_for_artist_key(&artist_id);
    let albums = cached(&ctx, &key, || async move {
        media.albums_for_artist(&artist_id).await
    })
    .await?;
    Ok(Json(albums))
}

/// GET /api/music/albums/:album_id/tracks
pub async fn tracks_for_album(
    State(ctx): State<AppContext>,
    Path(album_id): Path<String>,
) -> ApiResult<Json<AlbumTracks>> {
    check_item_id(&album_id)?;
    let media = ctx.media.clone();
    let key = tracks_for_album_key(&album_id);
    let tracks = cached(&ctx, &key, || async move { media.album_tracks(&album_id).await }).await?;
    Ok(Json(tracks))
}

/// GET /api/music/search?query=
pub async fn search(
    State(ctx): State<AppContext>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<SearchHit>>> {
    let query = params.query.trim();
    if query.is_empty() {
        return Err(Error::InvalidInput("Search query must not be empty.".to_string()).into());
    }
    debug!("Searching library for {:?}", query);
    Ok(Json(ctx.media.search(query).await?))
}

/// POST /api/music/clear-cache/:key
pub async fn clear_cache(
    State(ctx): State<AppContext>,
    Path(key): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    ctx.cache.clear(&key).await?;
    Ok(MessageResponse::new(format!("Cache cleared for key: {}", key)))
}

/// GET /api/music/artist-image/:artist_id
pub async fn artist_image(
    State(ctx): State<AppContext>,
    Path(artist_id): Path<String>,
) -> ApiResult<Response> {
    artwork(&ctx, &artist_id).await
}

/// GET /api/music/album-art/:album_id
pub async fn album_art(
    State(ctx): State<AppContext>,
    Path(album_id): Path<String>,
) -> ApiResult<Response> {
    artwork(&ctx, &album_id).await
}

async fn artwork(ctx: &AppContext, item_id: &str) -> ApiResult<Response> {
    check_item_id(item_id)?;
    let art = ctx.media.artwork(item_id).await?;
    Ok(([(header::CONTENT_TYPE, art.content_type)], art.bytes).into_response())
}
