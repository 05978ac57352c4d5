use crate::models::device::CaptureDevice;
use crate::models::error::CaptureError;
use crate::models::state::SessionState;

/// Event delegate for capture session notifications.
///
/// Called on the thread driving the controller. Implementations should
/// marshal to the UI thread if needed.
pub trait SessionDelegate: Send + Sync {
    /// Called when the controller state changes.
    fn on_state_changed(&self, state: &SessionState);

    /// Called when a recoverable error ends a configuration or start attempt.
    fn on_error(&self, error: &CaptureError);

    /// Called once frames start flowing from `device`.
    fn on_delivery_started(&self, device: &CaptureDevice);
}
