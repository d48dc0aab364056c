//! Platform error types

use scena_core::{PersistentId, WsErrorCode};
use thiserror::Error;

/// Session-service errors
#[derive(Error, Debug)]
pub enum PlatformError {
    /// No session with this persistent id
    #[error("Session not found: {0}")]
    SessionNotFound(PersistentId),

    /// Session exists but cannot take the request in its current state
    #[error("Session {id} in invalid state: {reason}")]
    InvalidState { id: PersistentId, reason: String },

    /// Session information is incomplete
    #[error("Invalid session info: {0}")]
    InvalidSessionInfo(String),

    /// Generic platform error
    #[error("Platform error: {0}")]
    Other(String),
}

impl PlatformError {
    /// Error code reported to scripting callers
    pub fn code(&self) -> WsErrorCode {
        match self {
            PlatformError::SessionNotFound(_) | PlatformError::InvalidState { .. } => {
                WsErrorCode::StateAbnormally
            }
            PlatformError::InvalidSessionInfo(_) => WsErrorCode::InvalidParam,
            PlatformError::Other(_) => WsErrorCode::SystemAbnormally,
        }
    }
}

/// Result type for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;
