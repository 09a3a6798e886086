use dashmap::DashSet;
use rendezvous_core::{IceServerConfig, PeerId};
use std::sync::Arc;

use crate::monitor::RoomMonitor;
use crate::relay::RelayConfig;
use crate::store::RoomStore;

struct RelayInner {
    store: Arc<dyn RoomStore>,
    config: RelayConfig,
    peers: DashSet<PeerId>,
}

/// Shared state of the WebSocket relay.
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayInner>,
}

impl RelayService {
    pub fn new(store: Arc<dyn RoomStore>, config: RelayConfig) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                store,
                config,
                peers: DashSet::new(),
            }),
        }
    }

    pub fn store(&self) -> Arc<dyn RoomStore> {
        self.inner.store.clone()
    }

    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    pub fn get_ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.config.ice_servers.clone()
    }

    pub fn monitor(&self) -> RoomMonitor {
        RoomMonitor::new(self.store(), self.inner.config.session.op_timeout)
    }

    /// `false` if the peer already holds a connection.
    pub fn add_peer(&self, peer_id: PeerId) -> bool {
        self.inner.peers.insert(peer_id)
    }

    pub fn remove_peer(&self, peer_id: &PeerId) {
        self.inner.peers.remove(peer_id);
    }

    pub fn connected_peers(&self) -> usize {
        self.inner.peers.len()
    }
}
