use async_trait::async_trait;
use rendezvous_core::{
    CandidateRecord, IceCandidate, MessageRecord, PeerId, Result, Room, RoomId, RoomStatus,
    SessionDescription,
};

use crate::store::Subscription;

/// Capability interface over whatever persists rooms and notifies about
/// their changes.
///
/// Contract every implementation upholds:
/// - `write_offer`/`write_answer` are compare-and-set: a room never holds two
///   different offers or two different answers. Rewriting the stored value is
///   accepted, a different value fails with `Error::Conflict`.
/// - `status` never leaves `Ended`.
/// - Subscriptions deliver at-least-once. A new subscription first replays
///   the current state (room snapshot, existing candidates or messages), then
///   pushes changes.
/// - `subscribe_candidates` never delivers a candidate whose `from` equals
///   `exclude`. Candidates of a single sender arrive in append order when the
///   backing store can guarantee it.
/// - `sequence` on every record is strictly increasing per store.
#[async_trait]
pub trait RoomStore: Send + Sync + 'static {
    /// Creating a room that exists fails with `Error::RoomExists`, except for a
    /// retry by the same creator with the same participants, which returns the
    /// stored room.
    async fn create_room(
        &self,
        room_id: &RoomId,
        participants: &[PeerId],
        created_by: &PeerId,
    ) -> Result<Room>;

    async fn get_room(&self, room_id: &RoomId) -> Result<Room>;

    async fn write_offer(
        &self,
        room_id: &RoomId,
        offer: SessionDescription,
        from: &PeerId,
    ) -> Result<()>;

    async fn write_answer(
        &self,
        room_id: &RoomId,
        answer: SessionDescription,
        from: &PeerId,
    ) -> Result<()>;

    async fn append_candidate(
        &self,
        room_id: &RoomId,
        candidate: IceCandidate,
        from: &PeerId,
    ) -> Result<CandidateRecord>;

    async fn append_message(
        &self,
        room_id: &RoomId,
        text: String,
        from: &PeerId,
    ) -> Result<MessageRecord>;

    async fn set_status(&self, room_id: &RoomId, status: RoomStatus, by: &PeerId) -> Result<()>;

    async fn subscribe_room(&self, room_id: &RoomId) -> Result<Subscription<Room>>;

    async fn subscribe_candidates(
        &self,
        room_id: &RoomId,
        exclude: &PeerId,
    ) -> Result<Subscription<CandidateRecord>>;

    async fn subscribe_messages(&self, room_id: &RoomId) -> Result<Subscription<MessageRecord>>;
}
