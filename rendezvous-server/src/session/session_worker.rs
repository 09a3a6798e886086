use rendezvous_core::{
    CandidateRecord, Error, MessageRecord, PeerId, Result, Room, RoomId, RoomStatus,
    SessionDescription,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::session::{
    CandidateBuffer, Role, SessionCommand, SessionConfig, SessionState, SignalingHandler,
};
use crate::store::{RoomStore, Subscription, bounded};

tokio::task_local! {
    /// Liveness flag of the session whose worker runs on the current task.
    static WORKER_LIVE: Arc<AtomicBool>;
}

/// True when called from inside the worker of the session owning `live`,
/// i.e. from one of its handler callbacks.
pub(crate) fn on_worker_task(live: &Arc<AtomicBool>) -> bool {
    WORKER_LIVE
        .try_with(|current| Arc::ptr_eq(current, live))
        .unwrap_or(false)
}

/// Owns all state of one session and processes its commands and store
/// notifications strictly one at a time.
pub(crate) struct SessionWorker {
    peer_id: PeerId,
    store: Arc<dyn RoomStore>,
    handler: Arc<dyn SignalingHandler>,
    config: SessionConfig,
    live: Arc<AtomicBool>,
    command_rx: mpsc::Receiver<SessionCommand>,
    state_tx: watch::Sender<SessionState>,

    room_id: Option<RoomId>,
    role: Option<Role>,
    room_feed: Option<Subscription<Room>>,
    candidate_feed: Option<Subscription<CandidateRecord>>,
    message_feed: Option<Subscription<MessageRecord>>,

    remote_offer_seen: bool,
    remote_answer_seen: bool,
    room_end_seen: bool,
    buffer: CandidateBuffer,
    seen_candidates: HashSet<u64>,
    seen_messages: HashSet<u64>,
}

impl SessionWorker {
    pub(crate) fn new(
        peer_id: PeerId,
        store: Arc<dyn RoomStore>,
        handler: Arc<dyn SignalingHandler>,
        config: SessionConfig,
        live: Arc<AtomicBool>,
        command_rx: mpsc::Receiver<SessionCommand>,
        state_tx: watch::Sender<SessionState>,
    ) -> Self {
        Self {
            peer_id,
            store,
            handler,
            config,
            live,
            command_rx,
            state_tx,
            room_id: None,
            role: None,
            room_feed: None,
            candidate_feed: None,
            message_feed: None,
            remote_offer_seen: false,
            remote_answer_seen: false,
            room_end_seen: false,
            buffer: CandidateBuffer::new(),
            seen_candidates: HashSet::new(),
            seen_messages: HashSet::new(),
        }
    }

    pub(crate) fn spawn(self) {
        let live = self.live.clone();
        tokio::spawn(WORKER_LIVE.scope(live, self.run()));
    }

    async fn run(mut self) {
        debug!("Session worker for {} started", self.peer_id);

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(SessionCommand::Leave { reply }) => {
                            self.leave().await;
                            let _ = reply.send(());
                            break;
                        }
                        Some(SessionCommand::Cleanup { reply }) => {
                            self.teardown();
                            let _ = reply.send(());
                            break;
                        }
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("All handles of session {} dropped. Shutting down.", self.peer_id);
                            break;
                        }
                    }
                }

                room = next_item(self.room_feed.as_mut()) => {
                    match room {
                        Some(r) => self.on_room_changed(r).await,
                        None => {
                            warn!("Room feed closed by store for {}", self.peer_id);
                            self.room_feed = None;
                        }
                    }
                }

                candidate = next_item(self.candidate_feed.as_mut()) => {
                    match candidate {
                        Some(c) => self.on_remote_candidate(c).await,
                        None => {
                            warn!("Candidate feed closed by store for {}", self.peer_id);
                            self.candidate_feed = None;
                        }
                    }
                }

                message = next_item(self.message_feed.as_mut()) => {
                    match message {
                        Some(m) => self.on_message(m).await,
                        None => {
                            warn!("Message feed closed by store for {}", self.peer_id);
                            self.message_feed = None;
                        }
                    }
                }
            }
        }

        self.teardown();
        debug!("Session worker for {} finished", self.peer_id);
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::CreateRoom {
                room_id,
                participants,
                reply,
            } => {
                let _ = reply.send(self.create_room(room_id, participants).await);
            }

            SessionCommand::JoinRoom { room_id, reply } => {
                let _ = reply.send(self.join_room(room_id).await);
            }

            SessionCommand::SendOffer { sdp, reply } => {
                let _ = reply.send(self.send_offer(sdp).await);
            }

            SessionCommand::SendAnswer { sdp, reply } => {
                let _ = reply.send(self.send_answer(sdp).await);
            }

            SessionCommand::SendCandidate { candidate, reply } => {
                let res = match self.bound_room() {
                    Ok(room_id) => {
                        bounded(
                            self.config.op_timeout,
                            "append_candidate",
                            self.store.append_candidate(&room_id, candidate, &self.peer_id),
                        )
                        .await
                    }
                    Err(e) => Err(e),
                };
                let _ = reply.send(res);
            }

            SessionCommand::SendMessage { text, reply } => {
                let res = match self.bound_room() {
                    Ok(room_id) => {
                        bounded(
                            self.config.op_timeout,
                            "append_message",
                            self.store.append_message(&room_id, text, &self.peer_id),
                        )
                        .await
                    }
                    Err(e) => Err(e),
                };
                let _ = reply.send(res);
            }

            SessionCommand::Leave { reply } | SessionCommand::Cleanup { reply } => {
                // Consumed by the run loop before dispatch.
                let _ = reply.send(());
            }
        }
    }

    async fn create_room(&mut self, room_id: RoomId, participants: Vec<PeerId>) -> Result<Room> {
        self.ensure_unbound()?;

        let room = bounded(
            self.config.op_timeout,
            "create_room",
            self.store
                .create_room(&room_id, &participants, &self.peer_id),
        )
        .await?;

        self.bind(&room).await?;
        info!("{} created room {}", self.peer_id, room.room_id);
        Ok(room)
    }

    async fn join_room(&mut self, room_id: RoomId) -> Result<Room> {
        self.ensure_unbound()?;

        let room = bounded(
            self.config.op_timeout,
            "get_room",
            self.store.get_room(&room_id),
        )
        .await?;

        if !room.is_active() {
            return Err(Error::RoomEnded(room_id));
        }
        if !room.admits(&self.peer_id) {
            return Err(Error::NotParticipant {
                room_id,
                peer_id: self.peer_id.clone(),
            });
        }

        self.bind(&room).await?;
        info!("{} joined room {}", self.peer_id, room.room_id);
        Ok(room)
    }

    /// Subscribes to the room's feeds. The session stays idle if any
    /// subscription fails.
    async fn bind(&mut self, room: &Room) -> Result<()> {
        let limit = self.config.op_timeout;
        let room_id = &room.room_id;

        let room_feed = bounded(limit, "subscribe_room", self.store.subscribe_room(room_id)).await?;
        let candidate_feed = bounded(
            limit,
            "subscribe_candidates",
            self.store.subscribe_candidates(room_id, &self.peer_id),
        )
        .await?;
        let message_feed = bounded(
            limit,
            "subscribe_messages",
            self.store.subscribe_messages(room_id),
        )
        .await?;

        self.room_id = Some(room_id.clone());
        self.room_feed = Some(room_feed);
        self.candidate_feed = Some(candidate_feed);
        self.message_feed = Some(message_feed);
        self.set_state(SessionState::Joined);
        Ok(())
    }

    async fn send_offer(&mut self, sdp: String) -> Result<()> {
        let room_id = self.bound_room()?;
        if self.role == Some(Role::Answerer) {
            return Err(Error::ProtocolViolation(
                "answering side cannot send an offer".into(),
            ));
        }

        bounded(
            self.config.op_timeout,
            "write_offer",
            self.store
                .write_offer(&room_id, SessionDescription::offer(sdp), &self.peer_id),
        )
        .await?;

        self.role = Some(Role::Offerer);
        if self.current_state() == SessionState::Joined {
            self.set_state(SessionState::Offering);
        }
        Ok(())
    }

    async fn send_answer(&mut self, sdp: String) -> Result<()> {
        let room_id = self.bound_room()?;
        if self.role == Some(Role::Offerer) {
            return Err(Error::ProtocolViolation(
                "offering side cannot send an answer".into(),
            ));
        }
        if !self.remote_offer_seen {
            return Err(Error::ProtocolViolation(
                "answer sent before an offer was received".into(),
            ));
        }

        bounded(
            self.config.op_timeout,
            "write_answer",
            self.store
                .write_answer(&room_id, SessionDescription::answer(sdp), &self.peer_id),
        )
        .await?;

        if self.role.is_none() {
            self.role = Some(Role::Answerer);
            self.set_state(SessionState::Answering);
            self.set_state(SessionState::Connected);
        }
        Ok(())
    }

    async fn on_room_changed(&mut self, room: Room) {
        if self.room_id.as_ref() != Some(&room.room_id) {
            return;
        }
        let room_id = room.room_id.clone();

        if let Some(offer) = room.offer {
            if offer.from != self.peer_id && !self.remote_offer_seen {
                self.remote_offer_seen = true;
                debug!("{} received offer in room {}", self.peer_id, room_id);
                if self.is_live() {
                    self.handler.on_offer(&room_id, offer).await;
                }
                if self.role != Some(Role::Offerer) {
                    self.flush_candidates(&room_id).await;
                }
            }
        }

        if let Some(answer) = room.answer {
            if answer.from != self.peer_id && !self.remote_answer_seen {
                self.remote_answer_seen = true;
                debug!("{} received answer in room {}", self.peer_id, room_id);
                if self.is_live() {
                    self.handler.on_answer(&room_id, answer).await;
                }
                if self.role == Some(Role::Offerer) {
                    self.flush_candidates(&room_id).await;
                    self.set_state(SessionState::Connected);
                }
            }
        }

        if room.status == RoomStatus::Ended && !self.room_end_seen {
            self.room_end_seen = true;
            let termination = rendezvous_core::RoomTermination {
                room_id: room_id.clone(),
                ended_by: room.ended_by,
                ended_at_ms: room.ended_at_ms,
            };

            if termination.ended_by.as_ref() != Some(&self.peer_id) {
                info!(
                    "Room {} ended by {:?}, notifying {}",
                    room_id, termination.ended_by, self.peer_id
                );
                if self.is_live() {
                    self.handler.on_room_ended(&room_id, termination).await;
                }
            }
        }
    }

    async fn on_remote_candidate(&mut self, record: CandidateRecord) {
        if record.from == self.peer_id {
            return;
        }
        if !self.seen_candidates.insert(record.sequence) {
            debug!("Duplicate candidate #{} dropped", record.sequence);
            return;
        }

        let Some(record) = self.buffer.push(record) else {
            debug!(
                "Buffered candidate for {} ({} pending)",
                self.peer_id,
                self.buffer.len()
            );
            return;
        };

        if self.is_live() {
            let room_id = record.room_id.clone();
            self.handler.on_candidate(&room_id, record).await;
        }
    }

    async fn on_message(&mut self, record: MessageRecord) {
        if !self.seen_messages.insert(record.sequence) {
            return;
        }
        if self.is_live() {
            let room_id = record.room_id.clone();
            self.handler.on_message(&room_id, record).await;
        }
    }

    async fn flush_candidates(&mut self, room_id: &RoomId) {
        let pending = self.buffer.release();
        if !pending.is_empty() {
            debug!("Flushing {} buffered candidates", pending.len());
        }

        for record in pending {
            if !self.is_live() {
                return;
            }
            self.handler.on_candidate(room_id, record).await;
        }
    }

    async fn leave(&mut self) {
        if let Some(room_id) = self.room_id.clone() {
            if !self.room_end_seen {
                let res = bounded(
                    self.config.op_timeout,
                    "set_status",
                    self.store
                        .set_status(&room_id, RoomStatus::Ended, &self.peer_id),
                )
                .await;

                match res {
                    Ok(()) => info!("{} ended room {}", self.peer_id, room_id),
                    Err(e) => warn!("Failed to mark room {} ended: {}", room_id, e),
                }
            }
        }

        self.teardown();
    }

    fn teardown(&mut self) {
        self.live.store(false, Ordering::SeqCst);
        self.room_feed = None;
        self.candidate_feed = None;
        self.message_feed = None;
        self.buffer.clear();
        self.set_state(SessionState::Ended);
    }

    fn ensure_unbound(&self) -> Result<()> {
        match self.current_state() {
            SessionState::Idle => Ok(()),
            SessionState::Ended => Err(Error::SessionEnded),
            _ => Err(Error::ProtocolViolation(
                "session is already bound to a room".into(),
            )),
        }
    }

    fn bound_room(&self) -> Result<RoomId> {
        if self.current_state() == SessionState::Ended {
            return Err(Error::SessionEnded);
        }
        self.room_id
            .clone()
            .ok_or_else(|| Error::ProtocolViolation("no room bound to session".into()))
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn current_state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, next: SessionState) {
        let prev = self.current_state();
        if prev == next || prev == SessionState::Ended {
            return;
        }
        debug!("Session {}: {} -> {}", self.peer_id, prev, next);
        self.state_tx.send_replace(next);
    }
}

async fn next_item<T>(feed: Option<&mut Subscription<T>>) -> Option<T> {
    match feed {
        Some(feed) => feed.recv().await,
        None => std::future::pending().await,
    }
}
