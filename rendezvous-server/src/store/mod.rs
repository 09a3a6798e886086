mod bounded;
mod memory_store;
mod room_store;
mod subscription;

pub use bounded::*;
pub use memory_store::*;
pub use room_store::*;
pub use subscription::*;
