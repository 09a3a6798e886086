use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No room bound yet.
    Idle,
    Joined,
    Offering,
    Answering,
    /// Offer and answer both observed locally.
    Connected,
    /// Terminal.
    Ended,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Joined => "joined",
            SessionState::Offering => "offering",
            SessionState::Answering => "answering",
            SessionState::Connected => "connected",
            SessionState::Ended => "ended",
        };
        write!(f, "{}", name)
    }
}

/// Which side of the negotiation this session took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Offerer,
    Answerer,
}
