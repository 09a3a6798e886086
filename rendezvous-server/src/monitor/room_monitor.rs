use rendezvous_core::{Result, RoomId, RoomStatus, RoomTermination};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::store::{RoomStore, bounded};

/// Read-side view of room lifecycles.
#[derive(Clone)]
pub struct RoomMonitor {
    store: Arc<dyn RoomStore>,
    op_timeout: Duration,
}

impl RoomMonitor {
    pub fn new(store: Arc<dyn RoomStore>, op_timeout: Duration) -> Self {
        Self { store, op_timeout }
    }

    /// One-shot read. Any failure, including a timeout or a missing room,
    /// reports the room as inactive.
    pub async fn is_active(&self, room_id: &RoomId) -> bool {
        match bounded(self.op_timeout, "get_room", self.store.get_room(room_id)).await {
            Ok(room) => room.is_active(),
            Err(e) => {
                debug!("Room {} treated as inactive: {}", room_id, e);
                false
            }
        }
    }

    /// Follows the room's status until it ends or the returned watch is dropped.
    pub async fn watch(&self, room_id: &RoomId) -> Result<RoomWatch> {
        let room = bounded(self.op_timeout, "get_room", self.store.get_room(room_id)).await?;
        let (tx, rx) = watch::channel(room.termination());

        if room.is_active() {
            let mut feed = bounded(
                self.op_timeout,
                "subscribe_room",
                self.store.subscribe_room(room_id),
            )
            .await?;
            let room_id = room_id.clone();

            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = tx.closed() => break,
                        update = feed.recv() => {
                            let Some(room) = update else { break };
                            let Some(termination) = room.termination() else { continue };

                            info!(
                                "Room {} transitioned to {} (ended by {:?})",
                                room_id, RoomStatus::Ended, termination.ended_by
                            );
                            let _ = tx.send(Some(termination));
                            break;
                        }
                    }
                }
            });
        }

        Ok(RoomWatch {
            room_id: room.room_id,
            rx,
        })
    }
}

/// Live status of one room, fed by a store subscription.
pub struct RoomWatch {
    room_id: RoomId,
    rx: watch::Receiver<Option<RoomTermination>>,
}

impl RoomWatch {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn status(&self) -> RoomStatus {
        match *self.rx.borrow() {
            Some(_) => RoomStatus::Ended,
            None => RoomStatus::Active,
        }
    }

    pub fn termination(&self) -> Option<RoomTermination> {
        self.rx.borrow().clone()
    }

    /// Resolves once the room ends. `None` if the store stopped reporting
    /// before that happened.
    pub async fn ended(&mut self) -> Option<RoomTermination> {
        match self.rx.wait_for(|t| t.is_some()).await {
            Ok(termination) => termination.clone(),
            Err(_) => None,
        }
    }
}
