use std::time::Duration;

pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upper bound for every store call made on behalf of the session.
    pub op_timeout: Duration,
    /// Capacity of the command queue between a `Session` handle and its worker.
    pub command_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            op_timeout: DEFAULT_OP_TIMEOUT,
            command_capacity: 32,
        }
    }
}
