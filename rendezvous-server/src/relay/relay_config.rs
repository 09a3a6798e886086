use rendezvous_core::IceServerConfig;

use crate::session::SessionConfig;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Handed to every peer in the `welcome` frame.
    pub ice_servers: Vec<IceServerConfig>,
    pub session: SessionConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig {
                urls: vec!["stun:stun.l.google.com:19302".to_owned()],
                username: None,
                credential: None,
            }],
            session: SessionConfig::default(),
        }
    }
}
