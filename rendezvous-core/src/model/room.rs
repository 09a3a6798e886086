use crate::model::peer::PeerId;
use crate::model::record::DescriptionRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room status only ever moves from `Active` to `Ended`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    #[default]
    Active,
    Ended,
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomStatus::Active => write!(f, "active"),
            RoomStatus::Ended => write!(f, "ended"),
        }
    }
}

/// Room document as held by a store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub room_id: RoomId,
    pub participants: BTreeSet<PeerId>,
    pub status: RoomStatus,
    pub offer: Option<DescriptionRecord>,
    pub answer: Option<DescriptionRecord>,
    pub created_by: PeerId,
    pub created_at_ms: u64,
    pub ended_by: Option<PeerId>,
    pub ended_at_ms: Option<u64>,
    /// Bumped by the store on every mutation of the document.
    pub revision: u64,
}

impl Room {
    pub fn new(
        room_id: RoomId,
        participants: impl IntoIterator<Item = PeerId>,
        created_by: PeerId,
        created_at_ms: u64,
    ) -> Self {
        Self {
            room_id,
            participants: participants.into_iter().collect(),
            status: RoomStatus::Active,
            offer: None,
            answer: None,
            created_by,
            created_at_ms,
            ended_by: None,
            ended_at_ms: None,
            revision: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == RoomStatus::Active
    }

    /// An empty participant set admits anyone.
    pub fn admits(&self, peer_id: &PeerId) -> bool {
        self.participants.is_empty() || self.participants.contains(peer_id)
    }

    pub fn termination(&self) -> Option<RoomTermination> {
        if self.is_active() {
            return None;
        }

        Some(RoomTermination {
            room_id: self.room_id.clone(),
            ended_by: self.ended_by.clone(),
            ended_at_ms: self.ended_at_ms,
        })
    }
}

/// Why and when a room stopped being active.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomTermination {
    pub room_id: RoomId,
    pub ended_by: Option<PeerId>,
    pub ended_at_ms: Option<u64>,
}
