use rendezvous_core::{CandidateRecord, IceCandidate, MessageRecord, PeerId, Result, Room, RoomId};
use tokio::sync::oneshot;

/// Commands a `Session` handle queues for its worker.
#[derive(Debug)]
pub enum SessionCommand {
    CreateRoom {
        room_id: RoomId,
        participants: Vec<PeerId>,
        reply: oneshot::Sender<Result<Room>>,
    },

    JoinRoom {
        room_id: RoomId,
        reply: oneshot::Sender<Result<Room>>,
    },

    SendOffer {
        sdp: String,
        reply: oneshot::Sender<Result<()>>,
    },

    SendAnswer {
        sdp: String,
        reply: oneshot::Sender<Result<()>>,
    },

    SendCandidate {
        candidate: IceCandidate,
        reply: oneshot::Sender<Result<CandidateRecord>>,
    },

    SendMessage {
        text: String,
        reply: oneshot::Sender<Result<MessageRecord>>,
    },

    /// Marks the room ended, then tears the session down.
    Leave { reply: oneshot::Sender<()> },

    /// Tears the session down without touching the room.
    Cleanup { reply: oneshot::Sender<()> },
}
