
pub use recording_handler::*;
pub use scripted_store::*;
pub use session_helpers::*;
pub use stalling_store::*;
