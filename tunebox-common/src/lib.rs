//! # TuneBox Common Library
//!
//! Shared code for the TuneBox jukebox backend:
//! - Error types
//! - Bootstrap configuration loading
//! - Queue, track, player and now-playing models
//! - WebSocket message types exchanged with browser clients

pub mod config;
pub mod error;
pub mod events;
pub mod models;

pub use error::{Error, Result};
