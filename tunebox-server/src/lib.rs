//! # TuneBox Server Library (tunebox-server)
//!
//! Shared jukebox backend: listeners add tracks from a Plex library to a
//! common play queue, the playback driver plays the queue on a Plex device,
//! and connected browsers receive live queue and now-playing updates over
//! WebSocket.

pub mod api;
pub mod broadcast;
pub mod cache;
pub mod db;
pub mod media;
pub mod playback;
pub mod state;

pub use state::AppContext;
pub use tunebox_common::{Error, Result};
