//! WebSocket message contract between the backend and browser clients
//!
//! Inbound messages are a closed set dispatched on their `type` field.
//! Outbound messages are full-state snapshots, never diffs.
//!
//! # Example
//!
//! ```
//! use tunebox_common::events::{ClientMessage, ParseError};
//!
//! assert_eq!(ClientMessage::parse(r#"{"type":"heartbeat"}"#), Ok(ClientMessage::Heartbeat));
//! assert_eq!(ClientMessage::parse(r#"{"message":"hi"}"#), Err(ParseError::MissingType));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{NowPlaying, QueueEntry};

const QUEUE_UPDATE: &str = "queue_update";
const MUSIC_CONTROL: &str = "music_control";
const HEARTBEAT: &str = "heartbeat";

/// Interest category a connection subscribes to
///
/// Clients may declare categories the server does not know about; those are
/// registered on demand and only receive pushes if something broadcasts to them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    /// Full queue snapshots
    QueueUpdate,
    /// Now-playing snapshots
    MusicControl,
    Other(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::QueueUpdate => QUEUE_UPDATE,
            Category::MusicControl => MUSIC_CONTROL,
            Category::Other(name) => name,
        }
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        match s {
            QUEUE_UPDATE => Category::QueueUpdate,
            MUSIC_CONTROL => Category::MusicControl,
            other => Category::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an inbound frame could not be turned into a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Not JSON, or not a JSON object
    Malformed(String),
    /// No string `type` field
    MissingType,
    /// `type` present but not one the server handles
    UnknownType(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Malformed(e) => write!(f, "malformed message: {}", e),
            ParseError::MissingType => f.write_str("message has no 'type'"),
            ParseError::UnknownType(t) => write!(f, "unknown message type '{}'", t),
        }
    }
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(rename = "type", default)]
    kind: Option<serde_json::Value>,
}

fn message_type(text: &str) -> Result<String, ParseError> {
    let raw: RawMessage =
        serde_json::from_str(text).map_err(|e| ParseError::Malformed(e.to_string()))?;
    match raw.kind {
        Some(serde_json::Value::String(kind)) if !kind.is_empty() => Ok(kind),
        _ => Err(ParseError::MissingType),
    }
}

/// Parse the first frame of a connection, which declares its category
pub fn parse_declaration(text: &str) -> Result<Category, ParseError> {
    message_type(text).map(|kind| Category::from(kind.as_str()))
}

/// Messages a registered client may send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMessage {
    /// Liveness probe, answered with `pong`
    Heartbeat,
    /// Request an immediate queue snapshot broadcast
    QueueUpdate,
    /// Request an immediate now-playing snapshot broadcast
    MusicControl,
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let kind = message_type(text)?;
        match kind.as_str() {
            HEARTBEAT => Ok(ClientMessage::Heartbeat),
            QUEUE_UPDATE => Ok(ClientMessage::QueueUpdate),
            MUSIC_CONTROL => Ok(ClientMessage::MusicControl),
            _ => Err(ParseError::UnknownType(kind)),
        }
    }
}

/// Messages pushed to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    QueueUpdate {
        message: String,
        queue: Vec<QueueEntry>,
    },
    MusicControl {
        message: String,
        current_track: NowPlaying,
    },
    Pong {
        message: String,
    },
}

impl ServerMessage {
    pub fn queue_update(queue: Vec<QueueEntry>) -> Self {
        ServerMessage::QueueUpdate {
            message: "Queue update".to_string(),
            queue,
        }
    }

    pub fn now_playing(current_track: NowPlaying) -> Self {
        ServerMessage::MusicControl {
            message: "Current track update".to_string(),
            current_track,
        }
    }

    pub fn pong() -> Self {
        ServerMessage::Pong {
            message: "pong".to_string(),
        }
    }

    /// Category whose subscribers receive this message (None for direct replies)
    pub fn category(&self) -> Option<Category> {
        match self {
            ServerMessage::QueueUpdate { .. } => Some(Category::QueueUpdate),
            ServerMessage::MusicControl { .. } => Some(Category::MusicControl),
            ServerMessage::Pong { .. } => None,
        }
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
