//! Live-update fan-out to WebSocket clients
//!
//! Each connection owns an unbounded outbox drained by its writer task.
//! Connections start out pending and join a category once they declare one;
//! only categorised connections receive pushes. A send that fails means the
//! writer has gone away, so that connection is pruned on the spot.

pub mod update_loop;

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use tunebox_common::events::{Category, ServerMessage};
use uuid::Uuid;

use crate::playback::{NowPlayingService, QueueStore};

pub use update_loop::spawn_update_loop;

pub type ConnectionId = Uuid;

/// Sending half of a connection's outbox
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

#[derive(Default)]
struct Registry {
    subscriptions: HashMap<Category, HashMap<ConnectionId, Outbox>>,
    pending: HashMap<ConnectionId, Outbox>,
}

impl Registry {
    fn remove(&mut self, id: &ConnectionId) {
        self.pending.remove(id);
        for connections in self.subscriptions.values_mut() {
            connections.remove(id);
        }
        self.subscriptions.retain(|_, connections| !connections.is_empty());
    }
}

/// Connection registry plus snapshot builders
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<RwLock<Registry>>,
    queue: Arc<QueueStore>,
    now_playing: Arc<NowPlayingService>,
}

impl Broadcaster {
    pub fn new(queue: Arc<QueueStore>, now_playing: Arc<NowPlayingService>) -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::default())),
            queue,
            now_playing,
        }
    }

    /// Track a connection that has not declared a category yet
    pub async fn register_pending(&self, id: ConnectionId, outbox: Outbox) {
        self.registry.write().await.pending.insert(id, outbox);
        debug!("Connection {} pending registration", id);
    }

    /// Move a pending connection into `category`
    ///
    /// Returns false if the connection is unknown (already gone).
    pub async fn subscribe(&self, id: ConnectionId, category: Category) -> bool {
        let mut registry = self.registry.write().await;
        let Some(outbox) = registry.pending.remove(&id) else {
            warn!("Cannot subscribe unknown connection {}", id);
            return false;
        };

        info!("Client {} connected to category {}", id, category);
        registry
            .subscriptions
            .entry(category)
            .or_default()
            .insert(id, outbox);
        true
    }

    /// Send to one connection within `category`; a miss is logged and ignored
    pub async fn unicast(&self, id: ConnectionId, category: &Category, message: ServerMessage) -> bool {
        let outbox = {
            let registry = self.registry.read().await;
            registry
                .subscriptions
                .get(category)
                .and_then(|connections| connections.get(&id))
                .cloned()
        };

        let Some(outbox) = outbox else {
            warn!("No connection {} in category {}", id, category);
            return false;
        };

        if outbox.send(message).is_err() {
            debug!("Connection {} closed, pruning", id);
            self.unsubscribe_all(id).await;
            return false;
        }
        true
    }

    /// Send to every connection in `category`, returning how many accepted it
    pub async fn broadcast(&self, category: &Category, message: ServerMessage) -> usize {
        let targets: Vec<(ConnectionId, Outbox)> = {
            let registry = self.registry.read().await;
            match registry.subscriptions.get(category) {
                Some(connections) => connections
                    .iter()
                    .map(|(id, outbox)| (*id, outbox.clone()))
                    .collect(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (id, outbox) in targets {
            if outbox.send(message.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(id);
            }
        }

        if !dead.is_empty() {
            let mut registry = self.registry.write().await;
            for id in &dead {
                debug!("Connection {} closed, pruning", id);
                registry.remove(id);
            }
        }

        debug!("Broadcast {} to {} clients", category, delivered);
        delivered
    }

    /// Forget a connection everywhere (idempotent)
    pub async fn unsubscribe_all(&self, id: ConnectionId) {
        self.registry.write().await.remove(&id);
        debug!("Connection {} unsubscribed", id);
    }

    /// True if any connection has declared a category
    pub async fn has_subscribers(&self) -> bool {
        !self.registry.read().await.subscriptions.is_empty()
    }

    pub async fn subscriber_count(&self, category: &Category) -> usize {
        self.registry
            .read()
            .await
            .subscriptions
            .get(category)
            .map_or(0, HashMap::len)
    }

    pub async fn pending_count(&self) -> usize {
        self.registry.read().await.pending.len()
    }

    /// Broadcast the full queue to `queue_update` subscribers
    pub async fn push_queue(&self) {
        match self.queue.list_all().await {
            Ok(entries) => {
                self.broadcast(&Category::QueueUpdate, ServerMessage::queue_update(entries))
                    .await;
            }
            Err(e) => warn!("Could not build queue snapshot: {}", e),
        }
    }

    /// Broadcast the now-playing snapshot to `music_control` subscribers
    ///
    /// Skipped when nothing is playing on the active device.
    pub async fn push_now_playing(&self) {
        match self.now_playing.current_playing().await {
            Ok(Some(now_playing)) => {
                self.broadcast(&Category::MusicControl, ServerMessage::now_playing(now_playing))
                    .await;
            }
            Ok(None) => debug!("Nothing is playing, skipping now-playing update"),
            Err(e) => warn!("Could not build now-playing snapshot: {}", e),
        }
    }
}
