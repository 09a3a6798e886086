mod room_monitor;

pub use room_monitor::*;
