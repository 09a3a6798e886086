mod monitor;
mod relay;
mod session;
mod store;

pub use monitor::*;
pub use relay::*;
pub use session::*;
pub use store::*;
