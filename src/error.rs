//! Error types for Hoist
//!
//! Uses `thiserror` for library errors; recoverable provider conditions
//! (stack already exists, nothing to update) never reach this enum - they are
//! absorbed by the deployer.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Hoist operations
pub type HoistResult<T> = Result<T, HoistError>;

/// Main error type for Hoist operations
#[derive(Error, Debug)]
pub enum HoistError {
    /// Required environment variable is absent
    #[error("missing environment variable '{name}' - check .env or CI secrets")]
    ConfigMissing { name: String },

    /// A required stack output was not reported by the provider
    #[error("stack '{stack}' did not report required output '{key}'")]
    MissingOutput { stack: String, key: String },

    /// Create or update failed for a reason the deployer cannot recover from
    #[error("stack operation on '{stack}' failed: {message}")]
    StackOperationFailed { stack: String, message: String },

    /// Stack never reached a terminal state within the wait ceiling
    #[error("timed out waiting for stack '{stack}' to reach a terminal state")]
    WaitTimeout { stack: String },

    /// Poll budget exhausted while the resource was still pending
    #[error("gave up waiting for {what} after {attempts} attempts")]
    PollTimeout { what: String, attempts: u32 },

    /// Polled resource reached a terminal failure state
    #[error("{what} failed: {reason}")]
    PollFailed { what: String, reason: String },

    /// Local state file (.env) is required but absent
    #[error("state file not found: {path}")]
    StateFileNotFound { path: PathBuf },

    /// Invalid `--phase` selection
    #[error(
        "unknown phase '{value}' - run with --phase init, configure DNS with your \
         provider, then rerun with --phase finalise"
    )]
    InvalidPhase { value: String },

    /// Provider API call failed outside the stack deploy path
    #[error("provider request failed: {message}")]
    Api { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
