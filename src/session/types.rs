use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_tungstenite::tungstenite::Utf8Bytes;

use crate::rules::{Mark, PlacementError};

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("room is full: {0}")]
    RoomFull(RoomId),

    #[error("connection has not joined a room")]
    NotJoined,

    #[error("connection already joined room {0}")]
    AlreadyJoined(RoomId),

    #[error("move rejected: {0}")]
    InvalidMove(MoveRejection),

    #[error("restart refused: both players must be ready")]
    NotReady,

    #[error("internal error: {0}")]
    Internal(String),
}

/// Reasons a move is refused under the validated move policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveRejection {
    #[error("waiting for an opponent")]
    WaitingForOpponent,

    #[error("game is already over")]
    GameOver,

    #[error("not {0}'s turn")]
    OutOfTurn(Mark),

    #[error("board must differ by exactly one new {0}")]
    BadSnapshot(Mark),

    #[error("{0}")]
    Placement(PlacementError),
}

impl From<MoveRejection> for SessionError {
    fn from(rejection: MoveRejection) -> Self {
        SessionError::InvalidMove(rejection)
    }
}

/// Room identifier, shared out-of-band between the two players.
///
/// Opaque and compared exactly; no normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// Connection ID, unique for the lifetime of the process ("conn_" + hex)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(u64);

impl ConnId {
    /// Allocate the next id; never repeats within a process
    pub fn next() -> Self {
        Self(NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn_{:08x}", self.0)
    }
}

/// Wrapper for outbound WebSocket messages using tungstenite's Utf8Bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage(Utf8Bytes);

impl OutboundMessage {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Get the inner Utf8Bytes for tungstenite Message::Text
    pub fn into_inner(self) -> Utf8Bytes {
        self.0
    }
}

impl From<String> for OutboundMessage {
    fn from(s: String) -> Self {
        Self(Utf8Bytes::from(s))
    }
}
