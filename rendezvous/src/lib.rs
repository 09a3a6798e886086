pub use rendezvous_core::{Error, PeerId, Result, RoomId};

pub mod model {
    pub use rendezvous_core::model::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use rendezvous_server::*;
}
