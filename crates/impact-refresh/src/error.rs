//! Error types for panel polling

use thiserror::Error;

/// Result type alias for scheduler operations
pub type Result<T> = std::result::Result<T, RefreshError>;

/// Errors raised by the scheduler itself; fetch failures never surface here
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// The scheduler was shut down and accepts no new panels
    #[error("Refresh scheduler is shut down")]
    ShutDown,

    /// A panel produced no result within the allowed wait
    #[error("Panel '{key}' did not load within {waited_ms}ms")]
    Timeout {
        /// Panel key
        key: String,
        /// How long the caller waited
        waited_ms: u128,
    },

    /// The panel's poller is gone
    #[error("Panel '{key}' is no longer active")]
    Closed {
        /// Panel key
        key: String,
    },
}
