use rendezvous_core::CandidateRecord;
use std::collections::VecDeque;

/// Holds remote candidates until the remote description has been applied.
///
/// Unbounded: a negotiation produces tens of candidates at most.
#[derive(Debug, Default)]
pub struct CandidateBuffer {
    pending: VecDeque<CandidateRecord>,
    released: bool,
}

impl CandidateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the candidate back when it can be delivered immediately.
    pub fn push(&mut self, candidate: CandidateRecord) -> Option<CandidateRecord> {
        if self.released {
            return Some(candidate);
        }
        self.pending.push_back(candidate);
        None
    }

    /// Opens the buffer and drains everything held so far in receipt order.
    pub fn release(&mut self) -> Vec<CandidateRecord> {
        self.released = true;
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
