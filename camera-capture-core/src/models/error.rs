use thiserror::Error;

/// Errors that can occur while discovering devices or configuring a capture session.
///
/// Index and generation mismatches on a [`SelectionIndex`](super::device::SelectionIndex)
/// are caller bugs and panic instead of producing one of these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("no capture devices found")]
    NoDevicesFound,

    #[error("permission denied")]
    PermissionDenied,

    #[error("device busy")]
    DeviceBusy,

    #[error("device not available")]
    DeviceNotAvailable,

    #[error("device disconnected: {id}")]
    DeviceDisconnected { id: String },

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl CaptureError {
    /// Whether the user can retry with the same or another device.
    ///
    /// Only an empty device list ends the flow.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::NoDevicesFound)
    }
}
