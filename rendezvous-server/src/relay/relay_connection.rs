use async_trait::async_trait;
use rendezvous_core::{
    CandidateRecord, ClientFrame, DescriptionRecord, EnvelopeKind, Error, MessageRecord, PeerId,
    Result, RoomId, RoomStatus, RoomTermination, ServerFrame, SignalEnvelope,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::relay::RelayService;
use crate::session::{Session, SignalingHandler};

/// Forwards session events to the socket as envelopes.
struct EnvelopeForwarder {
    peer_id: PeerId,
    out: mpsc::UnboundedSender<ServerFrame>,
}

impl EnvelopeForwarder {
    fn forward(&self, envelope: SignalEnvelope) {
        if self.out.send(ServerFrame::Signal(envelope)).is_err() {
            warn!("Attempted to signal disconnected peer {}", self.peer_id);
        }
    }
}

#[async_trait]
impl SignalingHandler for EnvelopeForwarder {
    async fn on_offer(&self, room_id: &RoomId, offer: DescriptionRecord) {
        self.forward(SignalEnvelope::description(room_id.clone(), &offer));
    }

    async fn on_answer(&self, room_id: &RoomId, answer: DescriptionRecord) {
        self.forward(SignalEnvelope::description(room_id.clone(), &answer));
    }

    async fn on_candidate(&self, _room_id: &RoomId, candidate: CandidateRecord) {
        self.forward(SignalEnvelope::candidate(&candidate));
    }

    async fn on_room_ended(&self, _room_id: &RoomId, termination: RoomTermination) {
        self.forward(SignalEnvelope::ended(&termination));
    }

    async fn on_message(&self, _room_id: &RoomId, message: MessageRecord) {
        self.forward(SignalEnvelope::message(&message));
    }
}

/// One socket's view of the relay: a session plus frame translation.
pub struct RelayConnection {
    peer_id: PeerId,
    session: Session,
    room_id: Option<RoomId>,
    out: mpsc::UnboundedSender<ServerFrame>,
}

impl RelayConnection {
    /// Opens the session and greets the peer with the relay's ICE servers.
    pub fn open(
        service: &RelayService,
        peer_id: PeerId,
        out: mpsc::UnboundedSender<ServerFrame>,
    ) -> Self {
        let handler = Arc::new(EnvelopeForwarder {
            peer_id: peer_id.clone(),
            out: out.clone(),
        });
        let session = Session::new(
            peer_id.clone(),
            service.store(),
            handler,
            service.config().session.clone(),
        );

        let _ = out.send(ServerFrame::Welcome {
            peer_id: peer_id.clone(),
            ice_servers: service.get_ice_servers(),
        });

        Self {
            peer_id,
            session,
            room_id: None,
            out,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns `false` once the peer has left and the socket should close.
    pub async fn handle_frame(&mut self, frame: ClientFrame) -> bool {
        let result = match frame {
            ClientFrame::CreateRoom {
                room_id,
                participants,
            } => {
                let room_id = room_id.unwrap_or_default();
                self.session
                    .create_room(room_id, participants)
                    .await
                    .map(|room| self.bound(room.room_id))
            }

            ClientFrame::JoinRoom { room_id } => self
                .session
                .join_room(room_id)
                .await
                .map(|room| self.bound(room.room_id)),

            ClientFrame::Signal(envelope) => match self.forward(envelope).await {
                Ok(open) if !open => return false,
                Ok(_) => Ok(None),
                Err(e) => Err(e),
            },

            ClientFrame::Leave => {
                self.session.leave().await;
                return false;
            }
        };

        match result {
            Ok(Some(frame)) => self.send(frame),
            Ok(None) => {}
            Err(e) => {
                warn!("Rejected frame from {}: {}", self.peer_id, e);
                self.send(ServerFrame::error(&e));
            }
        }
        true
    }

    /// Leaves the room on behalf of a peer whose socket went away.
    pub async fn close(self) {
        self.session.leave().await;
        info!("Relay connection of {} closed", self.peer_id);
    }

    fn bound(&mut self, room_id: RoomId) -> Option<ServerFrame> {
        self.room_id = Some(room_id.clone());
        Some(ServerFrame::Joined { room_id })
    }

    /// `Ok(false)` when the envelope ended the session.
    async fn forward(&self, envelope: SignalEnvelope) -> Result<bool> {
        if envelope.from_peer != self.peer_id {
            return Err(Error::ProtocolViolation(format!(
                "envelope claims to be from '{}'",
                envelope.from_peer
            )));
        }
        if self.room_id.as_ref() != Some(&envelope.room_id) {
            return Err(Error::ProtocolViolation(format!(
                "envelope addressed to room '{}' which this connection has not joined",
                envelope.room_id
            )));
        }

        match envelope.kind {
            EnvelopeKind::Offer => {
                let offer = envelope.to_description()?;
                self.session.send_offer(offer.sdp).await?;
            }
            EnvelopeKind::Answer => {
                let answer = envelope.to_description()?;
                self.session.send_answer(answer.sdp).await?;
            }
            EnvelopeKind::Candidate => {
                self.session.send_candidate(envelope.to_candidate()?).await?;
            }
            EnvelopeKind::Message => {
                self.session
                    .send_message(envelope.to_message_text()?)
                    .await?;
            }
            EnvelopeKind::Status => match envelope.to_status()? {
                RoomStatus::Ended => {
                    self.session.leave().await;
                    return Ok(false);
                }
                RoomStatus::Active => {
                    return Err(Error::ProtocolViolation(
                        "room status can only move to ended".into(),
                    ));
                }
            },
        }
        Ok(true)
    }

    fn send(&self, frame: ServerFrame) {
        if self.out.send(frame).is_err() {
            warn!("Attempted to send frame to disconnected peer {}", self.peer_id);
        }
    }
}
