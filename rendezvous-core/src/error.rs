use crate::model::{PeerId, RoomId, SdpKind};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("room '{0}' already exists")]
    RoomExists(RoomId),

    #[error("room '{0}' not found")]
    RoomNotFound(RoomId),

    #[error("room '{0}' has ended")]
    RoomEnded(RoomId),

    #[error("room '{room_id}' already holds a different {kind:?}")]
    Conflict { room_id: RoomId, kind: SdpKind },

    #[error("peer '{peer_id}' is not a participant of room '{room_id}'")]
    NotParticipant { room_id: RoomId, peer_id: PeerId },

    #[error("store operation '{0}' timed out")]
    StoreTimeout(&'static str),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("session has ended")]
    SessionEnded,

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

impl Error {
    /// Stable identifier for wire error frames.
    pub fn code(&self) -> &'static str {
        match self {
            Error::RoomExists(_) => "room_exists",
            Error::RoomNotFound(_) => "room_not_found",
            Error::RoomEnded(_) => "room_ended",
            Error::Conflict { .. } => "conflict",
            Error::NotParticipant { .. } => "not_participant",
            Error::StoreTimeout(_) => "store_timeout",
            Error::StoreUnavailable(_) => "store_unavailable",
            Error::SessionEnded => "session_ended",
            Error::ProtocolViolation(_) => "protocol_violation",
        }
    }

    /// Transient failures the caller may retry with backoff. The core itself
    /// never retries.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::StoreTimeout(_) | Error::StoreUnavailable(_))
    }
}
