use crate::error::{Error, Result};
use crate::model::peer::PeerId;
use crate::model::record::{CandidateRecord, DescriptionRecord, MessageRecord};
use crate::model::room::{RoomId, RoomStatus, RoomTermination};
use crate::model::signaling::{IceCandidate, IceServerConfig, SdpKind, SessionDescription};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    Offer,
    Answer,
    Candidate,
    Message,
    Status,
}

/// Transport-neutral signaling unit carried over relays that are not backed
/// by a document store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignalEnvelope {
    pub room_id: RoomId,
    pub kind: EnvelopeKind,
    pub from_peer: PeerId,
    pub payload: Value,
    #[serde(default)]
    pub timestamp: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagePayload {
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusPayload {
    status: RoomStatus,
    #[serde(default)]
    ended_by: Option<PeerId>,
}

impl SignalEnvelope {
    pub fn description(room_id: RoomId, record: &DescriptionRecord) -> Self {
        let kind = match record.description.kind {
            SdpKind::Offer => EnvelopeKind::Offer,
            SdpKind::Answer => EnvelopeKind::Answer,
        };

        Self {
            room_id,
            kind,
            from_peer: record.from.clone(),
            payload: json!(record.description),
            timestamp: record.timestamp_ms,
        }
    }

    pub fn candidate(record: &CandidateRecord) -> Self {
        Self {
            room_id: record.room_id.clone(),
            kind: EnvelopeKind::Candidate,
            from_peer: record.from.clone(),
            payload: json!(record.candidate),
            timestamp: record.timestamp_ms,
        }
    }

    pub fn message(record: &MessageRecord) -> Self {
        Self {
            room_id: record.room_id.clone(),
            kind: EnvelopeKind::Message,
            from_peer: record.from.clone(),
            payload: json!(MessagePayload {
                text: record.text.clone(),
            }),
            timestamp: record.timestamp_ms,
        }
    }

    /// `from_peer` is empty when the store did not record who ended the room.
    pub fn ended(termination: &RoomTermination) -> Self {
        Self {
            room_id: termination.room_id.clone(),
            kind: EnvelopeKind::Status,
            from_peer: termination
                .ended_by
                .clone()
                .unwrap_or_else(|| PeerId::from(String::new())),
            payload: json!(StatusPayload {
                status: RoomStatus::Ended,
                ended_by: termination.ended_by.clone(),
            }),
            timestamp: termination.ended_at_ms.unwrap_or_default(),
        }
    }

    pub fn to_description(&self) -> Result<SessionDescription> {
        let expected = match self.kind {
            EnvelopeKind::Offer => SdpKind::Offer,
            EnvelopeKind::Answer => SdpKind::Answer,
            other => return Err(self.wrong_kind(other)),
        };

        let description: SessionDescription = self.decode()?;
        if description.kind != expected {
            return Err(Error::ProtocolViolation(format!(
                "{:?} envelope carries a {:?} description",
                self.kind, description.kind
            )));
        }
        Ok(description)
    }

    pub fn to_candidate(&self) -> Result<IceCandidate> {
        match self.kind {
            EnvelopeKind::Candidate => self.decode(),
            other => Err(self.wrong_kind(other)),
        }
    }

    pub fn to_message_text(&self) -> Result<String> {
        match self.kind {
            EnvelopeKind::Message => self.decode::<MessagePayload>().map(|p| p.text),
            other => Err(self.wrong_kind(other)),
        }
    }

    pub fn to_status(&self) -> Result<RoomStatus> {
        match self.kind {
            EnvelopeKind::Status => self.decode::<StatusPayload>().map(|p| p.status),
            other => Err(self.wrong_kind(other)),
        }
    }

    fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            Error::ProtocolViolation(format!("malformed {:?} payload: {}", self.kind, e))
        })
    }

    fn wrong_kind(&self, kind: EnvelopeKind) -> Error {
        Error::ProtocolViolation(format!("unexpected {:?} envelope", kind))
    }
}

/// Frames a peer sends to the relay.
#[derive(Debug, Serialize, Deserialize)]
#[serde(
    tag = "op",
    content = "d",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientFrame {
    CreateRoom {
        room_id: Option<RoomId>,
        #[serde(default)]
        participants: Vec<PeerId>,
    },
    JoinRoom {
        room_id: RoomId,
    },
    Signal(SignalEnvelope),
    Leave,
}

/// Frames the relay sends to a peer.
#[derive(Debug, Serialize, Deserialize)]
#[serde(
    tag = "op",
    content = "d",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerFrame {
    Welcome {
        peer_id: PeerId,
        ice_servers: Vec<IceServerConfig>,
    },
    Joined {
        room_id: RoomId,
    },
    Signal(SignalEnvelope),
    Error {
        code: String,
        message: String,
    },
}

impl ServerFrame {
    pub fn error(err: &Error) -> Self {
        ServerFrame::Error {
            code: err.code().to_owned(),
            message: err.to_string(),
        }
    }
}
