use crate::model::peer::PeerId;
use crate::model::room::RoomId;
use crate::model::signaling::{IceCandidate, SessionDescription};
use serde::{Deserialize, Serialize};

// Records are ordered by `(timestamp_ms, sequence)`. `sequence` is assigned by
// the store and is strictly increasing, so it breaks ties between equal
// timestamps and stands in for them on stores without a server clock.

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionRecord {
    pub description: SessionDescription,
    pub from: PeerId,
    pub sequence: u64,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub room_id: RoomId,
    pub sequence: u64,
    pub from: PeerId,
    pub candidate: IceCandidate,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub room_id: RoomId,
    pub sequence: u64,
    pub from: PeerId,
    pub text: String,
    pub timestamp_ms: u64,
}

impl CandidateRecord {
    pub fn order_key(&self) -> (u64, u64) {
        (self.timestamp_ms, self.sequence)
    }
}

impl MessageRecord {
    pub fn order_key(&self) -> (u64, u64) {
        (self.timestamp_ms, self.sequence)
    }
}
