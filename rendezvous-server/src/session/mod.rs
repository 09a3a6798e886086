mod candidate_buffer;
mod session;
mod session_command;
mod session_config;
mod session_handler;
mod session_state;
mod session_worker;

pub use candidate_buffer::*;
pub use session::*;
pub use session_command::*;
pub use session_config::*;
pub use session_handler::*;
pub use session_state::*;
