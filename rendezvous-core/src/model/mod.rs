mod envelope;
mod peer;
mod record;
mod room;
mod signaling;

pub use envelope::{ClientFrame, EnvelopeKind, ServerFrame, SignalEnvelope};
pub use peer::PeerId;
pub use record::{CandidateRecord, DescriptionRecord, MessageRecord};
pub use room::{Room, RoomId, RoomStatus, RoomTermination};
pub use signaling::{IceCandidate, IceServerConfig, SdpKind, SessionDescription};
