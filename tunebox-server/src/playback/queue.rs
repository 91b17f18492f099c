//! Play queue backed by the store's ordered list
//!
//! FIFO of [`QueueEntry`] values serialized as JSON under a single list key.
//! Entries are unique by `item_id`. Store failures propagate unchanged; the
//! queue performs no retries.

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use tunebox_common::models::QueueEntry;
use tunebox_common::{Error, Result};

use crate::db::Store;

/// List key holding the queue
pub const QUEUE_KEY: &str = "playback_queue";

/// The authoritative play queue
pub struct QueueStore {
    store: Store,
    key: String,
    /// Serializes read-modify-write sequences (duplicate check + append)
    write_lock: Mutex<()>,
}

impl QueueStore {
    pub fn new(store: Store) -> Self {
        Self::with_key(store, QUEUE_KEY)
    }

    /// Queue stored under a custom list key
    pub fn with_key(store: Store, key: &str) -> Self {
        Self {
            store,
            key: key.to_string(),
            write_lock: Mutex::new(()),
        }
    }

    /// Append `entry` to the tail
    ///
    /// Fails with [`Error::Duplicate`] if an entry with the same id is queued;
    /// the queue is left untouched in that case.
    pub async fn enqueue(&self, entry: QueueEntry) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if self.contains(&entry.item_id).await? {
            return Err(Error::Duplicate(format!(
                "Song {} is already in the queue.",
                entry.title
            )));
        }

        let value = serde_json::to_string(&entry)?;
        self.store.rpush(&self.key, &value).await?;
        info!("Added {} to the playback queue.", entry.title);
        Ok(())
    }

    /// Remove the entry with `item_id`, returning it
    ///
    /// Fails with [`Error::NotFound`] if nothing with that id is queued.
    pub async fn dequeue_by_id(&self, item_id: &str) -> Result<QueueEntry> {
        let _guard = self.write_lock.lock().await;

        let found = self
            .raw_entries()
            .await?
            .into_iter()
            .find(|(_, entry)| entry.item_id == item_id);

        match found {
            Some((raw, entry)) => {
                self.store.lrem(&self.key, &raw).await?;
                info!("Removed {} from the playback queue.", entry.title);
                Ok(entry)
            }
            None => {
                debug!("Song with item_id {} not found in the queue", item_id);
                Err(Error::NotFound(format!(
                    "Song with id {} is not in the queue.",
                    item_id
                )))
            }
        }
    }

    /// Snapshot of all entries, oldest first
    pub async fn list_all(&self) -> Result<Vec<QueueEntry>> {
        Ok(self
            .raw_entries()
            .await?
            .into_iter()
            .map(|(_, entry)| entry)
            .collect())
    }

    /// Oldest entry, if any
    pub async fn head(&self) -> Result<Option<QueueEntry>> {
        Ok(self.list_all().await?.into_iter().next())
    }

    /// Remove everything (already empty is fine)
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store.delete_list(&self.key).await?;
        info!("The playback queue has been cleared.");
        Ok(())
    }

    pub async fn contains(&self, item_id: &str) -> Result<bool> {
        Ok(self
            .raw_entries()
            .await?
            .iter()
            .any(|(_, entry)| entry.item_id == item_id))
    }

    pub async fn len(&self) -> Result<u64> {
        self.store.llen(&self.key).await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Decoded entries paired with their stored form; undecodable values are skipped
    async fn raw_entries(&self) -> Result<Vec<(String, QueueEntry)>> {
        let values = self.store.lrange(&self.key).await?;
        let mut entries = Vec::with_capacity(values.len());
        for raw in values {
            match serde_json::from_str::<QueueEntry>(&raw) {
                Ok(entry) => entries.push((raw, entry)),
                Err(e) => warn!("Skipping undecodable queue value {:?}: {}", raw, e),
            }
        }
        Ok(entries)
    }
}
