use async_trait::async_trait;
use rendezvous_core::{CandidateRecord, DescriptionRecord, MessageRecord, RoomId, RoomTermination};

/// Receiver of signaling events, typically the peer-connection layer.
///
/// Callbacks run on the session's worker one at a time. `leave` and `cleanup`
/// may be awaited from a callback. Any other command on the same `Session`
/// would wait on the worker that is running the callback; spawn it instead.
#[async_trait]
pub trait SignalingHandler: Send + Sync + 'static {
    /// The remote description counts as applied once this returns. Candidates
    /// that arrived earlier are delivered right after.
    async fn on_offer(&self, room_id: &RoomId, offer: DescriptionRecord);

    /// Same application rule as `on_offer`, for the offering side.
    async fn on_answer(&self, room_id: &RoomId, answer: DescriptionRecord);

    async fn on_candidate(&self, room_id: &RoomId, candidate: CandidateRecord);

    /// The other side ended the room. The session still has to be cleaned up.
    async fn on_room_ended(&self, room_id: &RoomId, termination: RoomTermination);

    async fn on_message(&self, room_id: &RoomId, message: MessageRecord);
}
