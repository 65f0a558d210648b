use std::time::Duration;

use thiserror::Error;

/// Errors reported by an audio input device.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("device not available")]
    Unavailable,

    #[error("device i/o error: {0}")]
    Io(String),
}

/// Errors returned by session transitions and command dispatch.
///
/// Every variant except `ShutdownTimeout` and `Acquisition` leaves the session
/// state untouched, so the caller may retry or reset.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("device acquisition failed: {0}")]
    Acquisition(DeviceError),

    #[error("device acquisition timed out after {}ms", .0.as_millis())]
    AcquisitionTimeout(Duration),

    #[error("a recording session is already active")]
    AlreadyActive,

    #[error("no recording session is active")]
    NotActive,

    #[error("session failed: {0}; reset required")]
    SessionFailed(String),

    #[error("unsupported command: {0}")]
    UnsupportedCommand(String),

    #[error(
        "capture thread did not stop within {}ms; device force-released after {frames_captured} frames",
        .timeout.as_millis()
    )]
    ShutdownTimeout {
        timeout: Duration,
        frames_captured: u64,
    },

    #[error("start cancelled before the device was acquired")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to spawn capture thread: {0}")]
    Spawn(String),

    #[error("failed to encode reply: {0}")]
    Encode(String),
}

impl RecordError {
    /// Stable error code surfaced at the bridge boundary.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Acquisition(_) | Self::AcquisitionTimeout(_) => "ACQUISITION_ERROR",
            Self::AlreadyActive => "ALREADY_ACTIVE",
            Self::NotActive => "NOT_ACTIVE",
            Self::SessionFailed(_) => "SESSION_FAILED",
            Self::UnsupportedCommand(_) => "UNSUPPORTED_COMMAND",
            Self::ShutdownTimeout { .. } => "SHUTDOWN_TIMEOUT",
            Self::Cancelled => "CANCELLED",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Spawn(_) | Self::Encode(_) => "INTERNAL",
        }
    }
}

impl From<DeviceError> for RecordError {
    fn from(err: DeviceError) -> Self {
        Self::Acquisition(err)
    }
}
