//! HTTP and WebSocket surface

pub mod error;
pub mod handlers;
pub mod ws;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::state::AppContext;

pub use error::{ApiError, ApiResult};

/// Build the application router
pub fn create_router(ctx: AppContext) -> Router {
    let cors = cors_layer(&ctx.settings.allowed_origins);

    let music = Router::new()
        // Queue
        .route("/queue", get(handlers::list_queue))
        .route(
            "/queue/:item_id",
            post(handlers::enqueue).delete(handlers::dequeue),
        )
        .route("/clear-queue", post(handlers::clear_queue))
        // Playback
        .route("/play-queue", post(handlers::play_queue))
        .route("/stop-queue", post(handlers::stop_queue))
        .route("/playback-status", get(handlers::playback_status))
        // Devices
        .route("/players", get(handlers::list_players))
        .route("/active-player", get(handlers::active_player))
        .route("/now-playing", get(handlers::now_playing))
        // Library
        .route("/artists", get(handlers::list_artists))
        .route("/artists/:artist_id/albums", get(handlers::albums_for_artist))
        .route("/albums/:album_id/tracks", get(handlers::tracks_for_album))
        .route("/search", get(handlers::search))
        .route("/clear-cache/:key", post(handlers::clear_cache))
        .route("/artist-image/:artist_id", get(handlers::artist_image))
        .route("/album-art/:album_id", get(handlers::album_art));

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/ws", get(ws::ws_handler))
        .nest("/api/music", music)
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Permissive CORS unless specific origins are configured
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {}: {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}
