//! Application context
//!
//! Every long-lived component is built once at startup and handed to the
//! HTTP handlers, the WebSocket handler and the update loop through this
//! struct. There is no global state.

use std::sync::Arc;
use tunebox_common::config::Settings;

use crate::broadcast::Broadcaster;
use crate::cache::LibraryCache;
use crate::db::Store;
use crate::media::MediaServer;
use crate::playback::{shared_tracker, NowPlayingService, PlaybackDriver, QueueStore, SharedTracker};

/// Shared application context passed to all handlers
///
/// Cloning is cheap; all components are reference counted.
#[derive(Clone)]
pub struct AppContext {
    pub settings: Arc<Settings>,
    pub queue: Arc<QueueStore>,
    pub cache: LibraryCache,
    pub media: Arc<dyn MediaServer>,
    pub tracker: SharedTracker,
    pub now_playing: Arc<NowPlayingService>,
    pub broadcaster: Broadcaster,
    pub driver: Arc<PlaybackDriver>,
}

impl AppContext {
    /// Wire up all components over an open store and media server
    pub fn new(settings: Settings, store: Store, media: Arc<dyn MediaServer>) -> Self {
        let queue = Arc::new(QueueStore::new(store.clone()));
        let cache = LibraryCache::new(store, settings.cache_ttl);
        let tracker = shared_tracker();
        let now_playing = Arc::new(NowPlayingService::new(
            Arc::clone(&media),
            Arc::clone(&tracker),
            settings.client_name.clone(),
        ));
        let broadcaster = Broadcaster::new(Arc::clone(&queue), Arc::clone(&now_playing));
        let driver = Arc::new(PlaybackDriver::new(
            Arc::clone(&queue),
            Arc::clone(&media),
            Arc::clone(&tracker),
            broadcaster.clone(),
            settings.client_name.clone(),
            settings.poll_interval,
        ));

        Self {
            settings: Arc::new(settings),
            queue,
            cache,
            media,
            tracker,
            now_playing,
            broadcaster,
            driver,
        }
    }
}
