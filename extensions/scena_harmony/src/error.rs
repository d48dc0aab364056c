//! Binding-layer errors

use scena_core::{WsError, WsErrorCode};
use scena_platform::PlatformError;
use scena_script::ScriptError;
use thiserror::Error;

/// Errors raised while binding platform objects to scripting code
#[derive(Error, Debug)]
pub enum HarmonyError {
    /// Argument check failed at the scripting boundary
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Ws(#[from] WsError),

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

impl HarmonyError {
    /// Error code reported to scripting callers
    pub fn code(&self) -> WsErrorCode {
        match self {
            HarmonyError::InvalidParam(_) => WsErrorCode::InvalidParam,
            HarmonyError::Script(ScriptError::Conversion { .. }) => WsErrorCode::InvalidParam,
            HarmonyError::Script(_) => WsErrorCode::StateAbnormally,
            HarmonyError::Ws(e) => e.code(),
            HarmonyError::Platform(e) => e.code(),
        }
    }
}

/// Result type for binding operations
pub type Result<T> = std::result::Result<T, HarmonyError>;
