//! Window-scene error codes and core error types

use thiserror::Error;

/// Error codes surfaced to scripting callers
///
/// The numeric values are part of the scripting API contract and must not
/// change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WsErrorCode {
    Ok,
    NoPermission,
    InvalidParam,
    DeviceNotSupport,
    RepeatOperation,
    StateAbnormally,
    SystemAbnormally,
}

impl WsErrorCode {
    /// Numeric code as seen by scripting code
    pub const fn code(self) -> i32 {
        match self {
            WsErrorCode::Ok => 0,
            WsErrorCode::NoPermission => 201,
            WsErrorCode::InvalidParam => 401,
            WsErrorCode::DeviceNotSupport => 801,
            WsErrorCode::RepeatOperation => 1_300_001,
            WsErrorCode::StateAbnormally => 1_300_002,
            WsErrorCode::SystemAbnormally => 1_300_003,
        }
    }

    /// Default message attached to a thrown error with this code
    pub const fn message(self) -> &'static str {
        match self {
            WsErrorCode::Ok => "",
            WsErrorCode::NoPermission => "Permission verification failed",
            WsErrorCode::InvalidParam => "Input parameter is missing or invalid",
            WsErrorCode::DeviceNotSupport => "Capability not supported",
            WsErrorCode::RepeatOperation => "Repeated operation",
            WsErrorCode::StateAbnormally => "This window state is abnormal",
            WsErrorCode::SystemAbnormally => "This window manager service works abnormally",
        }
    }

    /// Look up a code from its numeric value
    pub fn from_code(code: i32) -> Option<Self> {
        [
            WsErrorCode::Ok,
            WsErrorCode::NoPermission,
            WsErrorCode::InvalidParam,
            WsErrorCode::DeviceNotSupport,
            WsErrorCode::RepeatOperation,
            WsErrorCode::StateAbnormally,
            WsErrorCode::SystemAbnormally,
        ]
        .into_iter()
        .find(|c| c.code() == code)
    }
}

/// Core runtime errors
#[derive(Error, Debug)]
pub enum WsError {
    /// Caller passed something unusable
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    /// Event name is not in the built-in registry
    #[error("Unknown callback type: {0}")]
    UnknownCallback(String),

    /// The owner-thread run loop is gone or was never started
    #[error("Event runner unavailable: {0}")]
    RunnerUnavailable(String),

    /// Failed to start the owner thread or the fallback pool
    #[error("Failed to spawn worker: {0}")]
    Spawn(String),

    /// Object was already destroyed
    #[error("Object destroyed: {0}")]
    Destroyed(String),
}

impl WsError {
    /// Error code reported to scripting callers
    pub fn code(&self) -> WsErrorCode {
        match self {
            WsError::InvalidParam(_) | WsError::UnknownCallback(_) => WsErrorCode::InvalidParam,
            WsError::RunnerUnavailable(_) | WsError::Spawn(_) => WsErrorCode::SystemAbnormally,
            WsError::Destroyed(_) => WsErrorCode::StateAbnormally,
        }
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, WsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_roundtrip_through_lookup() {
        assert_eq!(WsErrorCode::InvalidParam.code(), 401);
        assert_eq!(WsErrorCode::from_code(1_300_002), Some(WsErrorCode::StateAbnormally));
        assert_eq!(WsErrorCode::from_code(7), None);
    }

    #[test]
    fn test_error_maps_to_code() {
        let err = WsError::UnknownCallback("nope".to_string());
        assert_eq!(err.code(), WsErrorCode::InvalidParam);
        assert_eq!(err.to_string(), "Unknown callback type: nope");
    }
}
