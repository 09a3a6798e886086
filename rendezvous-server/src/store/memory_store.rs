use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rendezvous_core::{
    CandidateRecord, DescriptionRecord, Error, IceCandidate, MessageRecord, PeerId, Result, Room,
    RoomId, RoomStatus, SdpKind, SessionDescription,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::debug;

use crate::store::{RoomStore, Subscription};

struct RoomEntry {
    room: Room,
    candidates: Vec<CandidateRecord>,
    messages: Vec<MessageRecord>,
    room_subs: Vec<mpsc::UnboundedSender<Room>>,
    candidate_subs: Vec<(PeerId, mpsc::UnboundedSender<CandidateRecord>)>,
    message_subs: Vec<mpsc::UnboundedSender<MessageRecord>>,
}

impl RoomEntry {
    fn new(room: Room) -> Self {
        Self {
            room,
            candidates: Vec::new(),
            messages: Vec::new(),
            room_subs: Vec::new(),
            candidate_subs: Vec::new(),
            message_subs: Vec::new(),
        }
    }

    fn publish_room(&mut self) {
        self.room.revision += 1;
        let room = &self.room;
        self.room_subs.retain(|tx| tx.send(room.clone()).is_ok());
    }

    fn publish_candidate(&mut self, record: &CandidateRecord) {
        self.candidate_subs.retain(|(exclude, tx)| {
            if *exclude == record.from {
                return !tx.is_closed();
            }
            tx.send(record.clone()).is_ok()
        });
    }

    fn publish_message(&mut self, record: &MessageRecord) {
        self.message_subs.retain(|tx| tx.send(record.clone()).is_ok());
    }

    fn ensure_active(&self) -> Result<()> {
        if self.room.is_active() {
            Ok(())
        } else {
            Err(Error::RoomEnded(self.room.room_id.clone()))
        }
    }
}

struct MemoryInner {
    rooms: DashMap<RoomId, RoomEntry>,
    sequence: AtomicU64,
}

/// In-process room store. Clones share the same rooms, so one instance can
/// back every session of a relay process, or both peers of a test.
#[derive(Clone)]
pub struct MemoryRoomStore {
    inner: Arc<MemoryInner>,
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                rooms: DashMap::new(),
                sequence: AtomicU64::new(0),
            }),
        }
    }

    pub fn room_count(&self) -> usize {
        self.inner.rooms.len()
    }

    /// Drops ended rooms. Retention is a policy of the embedding process; the
    /// signaling core never calls this.
    pub fn purge_ended(&self) -> usize {
        let before = self.inner.rooms.len();
        self.inner.rooms.retain(|_, entry| entry.room.is_active());
        before - self.inner.rooms.len()
    }

    fn next_sequence(&self) -> u64 {
        self.inner.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn write_description(
        &self,
        room_id: &RoomId,
        description: SessionDescription,
        from: &PeerId,
    ) -> Result<()> {
        let mut entry = self
            .inner
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| Error::RoomNotFound(room_id.clone()))?;
        entry.ensure_active()?;

        let kind = description.kind;
        let slot = match kind {
            SdpKind::Offer => &entry.room.offer,
            SdpKind::Answer => &entry.room.answer,
        };

        // Only the peer that won the slot may rewrite it, and only unchanged
        if let Some(existing) = slot {
            if existing.description == description && existing.from == *from {
                return Ok(());
            }
            return Err(Error::Conflict {
                room_id: room_id.clone(),
                kind,
            });
        }

        let record = DescriptionRecord {
            description,
            from: from.clone(),
            sequence: self.next_sequence(),
            timestamp_ms: now_ms(),
        };
        match kind {
            SdpKind::Offer => entry.room.offer = Some(record),
            SdpKind::Answer => entry.room.answer = Some(record),
        }

        debug!("Stored {:?} for room {} from {}", kind, room_id, from);
        entry.publish_room();
        Ok(())
    }
}

impl Default for MemoryRoomStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn create_room(
        &self,
        room_id: &RoomId,
        participants: &[PeerId],
        created_by: &PeerId,
    ) -> Result<Room> {
        match self.inner.rooms.entry(room_id.clone()) {
            Entry::Occupied(entry) => {
                let room = &entry.get().room;
                let requested: BTreeSet<PeerId> = participants.iter().cloned().collect();
                if room.created_by == *created_by && room.participants == requested {
                    Ok(room.clone())
                } else {
                    Err(Error::RoomExists(room_id.clone()))
                }
            }
            Entry::Vacant(slot) => {
                let room = Room::new(
                    room_id.clone(),
                    participants.iter().cloned(),
                    created_by.clone(),
                    now_ms(),
                );
                slot.insert(RoomEntry::new(room.clone()));
                debug!("Created room {} by {}", room_id, created_by);
                Ok(room)
            }
        }
    }

    async fn get_room(&self, room_id: &RoomId) -> Result<Room> {
        self.inner
            .rooms
            .get(room_id)
            .map(|entry| entry.room.clone())
            .ok_or_else(|| Error::RoomNotFound(room_id.clone()))
    }

    async fn write_offer(
        &self,
        room_id: &RoomId,
        offer: SessionDescription,
        from: &PeerId,
    ) -> Result<()> {
        if offer.kind != SdpKind::Offer {
            return Err(Error::ProtocolViolation("answer written as offer".into()));
        }
        self.write_description(room_id, offer, from)
    }

    async fn write_answer(
        &self,
        room_id: &RoomId,
        answer: SessionDescription,
        from: &PeerId,
    ) -> Result<()> {
        if answer.kind != SdpKind::Answer {
            return Err(Error::ProtocolViolation("offer written as answer".into()));
        }
        self.write_description(room_id, answer, from)
    }

    async fn append_candidate(
        &self,
        room_id: &RoomId,
        candidate: IceCandidate,
        from: &PeerId,
    ) -> Result<CandidateRecord> {
        let mut entry = self
            .inner
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| Error::RoomNotFound(room_id.clone()))?;
        entry.ensure_active()?;

        let record = CandidateRecord {
            room_id: room_id.clone(),
            sequence: self.next_sequence(),
            from: from.clone(),
            candidate,
            timestamp_ms: now_ms(),
        };
        entry.candidates.push(record.clone());
        entry.publish_candidate(&record);
        Ok(record)
    }

    async fn append_message(
        &self,
        room_id: &RoomId,
        text: String,
        from: &PeerId,
    ) -> Result<MessageRecord> {
        let mut entry = self
            .inner
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| Error::RoomNotFound(room_id.clone()))?;
        entry.ensure_active()?;

        let record = MessageRecord {
            room_id: room_id.clone(),
            sequence: self.next_sequence(),
            from: from.clone(),
            text,
            timestamp_ms: now_ms(),
        };
        entry.messages.push(record.clone());
        entry.publish_message(&record);
        Ok(record)
    }

    async fn set_status(&self, room_id: &RoomId, status: RoomStatus, by: &PeerId) -> Result<()> {
        let mut entry = self
            .inner
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| Error::RoomNotFound(room_id.clone()))?;

        match (entry.room.status, status) {
            (RoomStatus::Active, RoomStatus::Active) | (RoomStatus::Ended, RoomStatus::Ended) => {
                Ok(())
            }
            (RoomStatus::Ended, RoomStatus::Active) => Err(Error::RoomEnded(room_id.clone())),
            (RoomStatus::Active, RoomStatus::Ended) => {
                entry.room.status = RoomStatus::Ended;
                entry.room.ended_by = Some(by.clone());
                entry.room.ended_at_ms = Some(now_ms());
                debug!("Room {} ended by {}", room_id, by);
                entry.publish_room();
                Ok(())
            }
        }
    }

    async fn subscribe_room(&self, room_id: &RoomId) -> Result<Subscription<Room>> {
        let mut entry = self
            .inner
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| Error::RoomNotFound(room_id.clone()))?;

        let (tx, subscription) = Subscription::channel();
        let _ = tx.send(entry.room.clone());
        entry.room_subs.push(tx);
        Ok(subscription)
    }

    async fn subscribe_candidates(
        &self,
        room_id: &RoomId,
        exclude: &PeerId,
    ) -> Result<Subscription<CandidateRecord>> {
        let mut entry = self
            .inner
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| Error::RoomNotFound(room_id.clone()))?;

        let (tx, subscription) = Subscription::channel();
        for record in entry.candidates.iter().filter(|c| c.from != *exclude) {
            let _ = tx.send(record.clone());
        }
        entry.candidate_subs.push((exclude.clone(), tx));
        Ok(subscription)
    }

    async fn subscribe_messages(&self, room_id: &RoomId) -> Result<Subscription<MessageRecord>> {
        let mut entry = self
            .inner
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| Error::RoomNotFound(room_id.clone()))?;

        let (tx, subscription) = Subscription::channel();
        for record in &entry.messages {
            let _ = tx.send(record.clone());
        }
        entry.message_subs.push(tx);
        Ok(subscription)
    }
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
