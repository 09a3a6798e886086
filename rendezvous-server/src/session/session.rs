use rendezvous_core::{
    CandidateRecord, Error, IceCandidate, MessageRecord, PeerId, Result, Room, RoomId,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};

use crate::monitor::RoomMonitor;
use crate::session::session_worker::{SessionWorker, on_worker_task};
use crate::session::{SessionCommand, SessionConfig, SessionState, SignalingHandler};
use crate::store::RoomStore;

/// Signaling session of one peer in one room.
///
/// Cheap to clone; every clone drives the same worker. Commands are queued
/// and executed in order, interleaved with incoming store notifications.
#[derive(Clone)]
pub struct Session {
    peer_id: PeerId,
    command_tx: mpsc::Sender<SessionCommand>,
    live: Arc<AtomicBool>,
    state_rx: watch::Receiver<SessionState>,
    monitor: RoomMonitor,
}

impl Session {
    /// Spawns the session worker on the current tokio runtime.
    pub fn new(
        peer_id: PeerId,
        store: Arc<dyn RoomStore>,
        handler: Arc<dyn SignalingHandler>,
        config: SessionConfig,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(config.command_capacity.max(1));
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);
        let live = Arc::new(AtomicBool::new(true));
        let monitor = RoomMonitor::new(store.clone(), config.op_timeout);

        let worker = SessionWorker::new(
            peer_id.clone(),
            store,
            handler,
            config,
            live.clone(),
            command_rx,
            state_tx,
        );
        worker.spawn();

        Self {
            peer_id,
            command_tx,
            live,
            state_rx,
            monitor,
        }
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    pub fn is_ended(&self) -> bool {
        !self.live.load(Ordering::SeqCst)
    }

    pub async fn create_room(&self, room_id: RoomId, participants: Vec<PeerId>) -> Result<Room> {
        self.request(|reply| SessionCommand::CreateRoom {
            room_id,
            participants,
            reply,
        })
        .await
    }

    pub async fn join_room(&self, room_id: RoomId) -> Result<Room> {
        self.request(|reply| SessionCommand::JoinRoom { room_id, reply })
            .await
    }

    pub async fn send_offer(&self, sdp: impl Into<String>) -> Result<()> {
        let sdp = sdp.into();
        self.request(|reply| SessionCommand::SendOffer { sdp, reply })
            .await
    }

    pub async fn send_answer(&self, sdp: impl Into<String>) -> Result<()> {
        let sdp = sdp.into();
        self.request(|reply| SessionCommand::SendAnswer { sdp, reply })
            .await
    }

    pub async fn send_candidate(&self, candidate: IceCandidate) -> Result<CandidateRecord> {
        self.request(|reply| SessionCommand::SendCandidate { candidate, reply })
            .await
    }

    pub async fn send_message(&self, text: impl Into<String>) -> Result<MessageRecord> {
        let text = text.into();
        self.request(|reply| SessionCommand::SendMessage { text, reply })
            .await
    }

    /// Point-in-time check, independent of the room this session is bound to.
    pub async fn is_room_active(&self, room_id: &RoomId) -> Result<bool> {
        if self.is_ended() {
            return Err(Error::SessionEnded);
        }
        Ok(self.monitor.is_active(room_id).await)
    }

    /// Marks the room ended and releases the session. No callback fires once
    /// this has been called. Calling it again is a no-op.
    ///
    /// From inside a callback of this session it returns before the worker
    /// has torn down; teardown follows as soon as the callback returns.
    pub async fn leave(&self) {
        self.shutdown(|reply| SessionCommand::Leave { reply }).await;
    }

    /// Releases the session without touching the room, e.g. after the other
    /// side ended it. No callback fires once this has been called.
    pub async fn cleanup(&self) {
        self.shutdown(|reply| SessionCommand::Cleanup { reply }).await;
    }

    async fn shutdown(&self, build: impl FnOnce(oneshot::Sender<()>) -> SessionCommand) {
        if !self.live.swap(false, Ordering::SeqCst) {
            return;
        }

        let (tx, rx) = oneshot::channel();
        let command = build(tx);

        // Inside a callback the worker is busy running us, so waiting for its
        // reply would never finish. It picks the command up once we return.
        if on_worker_task(&self.live) {
            if let Err(TrySendError::Full(command)) = self.command_tx.try_send(command) {
                let command_tx = self.command_tx.clone();
                tokio::spawn(async move {
                    let _ = command_tx.send(command).await;
                });
            }
            return;
        }

        if self.command_tx.send(command).await.is_ok() {
            let _ = rx.await;
        }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> SessionCommand,
    ) -> Result<T> {
        if self.is_ended() {
            return Err(Error::SessionEnded);
        }

        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(build(tx))
            .await
            .map_err(|_| Error::SessionEnded)?;
        rx.await.map_err(|_| Error::SessionEnded)?
    }
}
