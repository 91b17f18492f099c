//! Key-value store backend
//!
//! Provides the two capabilities the jukebox needs from its store:
//! named ordered lists (the play queue) and string values with expiry
//! (library listing cache). Backed by SQLite through sqlx.

pub mod cache;
pub mod lists;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;
use tunebox_common::Result;

/// Database path that selects a private in-memory store
pub const IN_MEMORY: &str = ":memory:";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS list_items (
        id       INTEGER PRIMARY KEY AUTOINCREMENT,
        list_key TEXT NOT NULL,
        value    TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_list_items_key ON list_items(list_key, id)",
    r#"
    CREATE TABLE IF NOT EXISTS cache_entries (
        key        TEXT PRIMARY KEY,
        value      TEXT NOT NULL,
        expires_at INTEGER NOT NULL
    )
    "#,
];

/// Handle to the backing store
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if needed) the database at `path`
    pub async fn open(path: &Path) -> Result<Self> {
        if path.as_os_str() == IN_MEMORY {
            return Self::in_memory().await;
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Some(Duration::from_secs(60)))
            .connect_with(options)
            .await?;

        info!("Connected to store: {:?}", path);
        Self::with_pool(pool).await
    }

    /// Private in-memory store (single connection so every query sees the same database)
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create tables if missing (idempotent)
    async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Close all connections; later operations fail with a store error
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
