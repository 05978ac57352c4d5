use std::sync::Arc;

use crate::models::device::CaptureDevice;
use crate::models::error::CaptureError;
use crate::models::frame::VideoFrame;

/// Callback invoked for every frame the session produces.
///
/// Fires on the backend's delivery thread, so keep the work short.
pub type FrameCallback = Arc<dyn Fn(&VideoFrame) + Send + Sync + 'static>;

/// Callback invoked when delivery stops on its own after `start_running`
/// succeeded, e.g. the device was unplugged mid-stream.
///
/// Fires at most once per `start_running`, on the delivery thread.
pub type FailureCallback = Arc<dyn Fn(&CaptureError) + Send + Sync + 'static>;

/// Platform capture session: one device input, one frame output.
///
/// Implemented by:
/// - `VirtualBackend` (synthetic frames, any platform)
/// - `MediaFoundationBackend` (Windows)
///
/// Only the session controller calls these, and only from one thread at a
/// time. Input and output changes made between `begin_configuration` and
/// `commit_configuration` must take effect together.
pub trait CaptureBackend: Send {
    /// An opened device, ready to be bound.
    type Input: Send;

    /// Open `device` for capture. Fails with `DeviceBusy`,
    /// `PermissionDenied` or `DeviceNotAvailable` when the hardware refuses.
    fn open_input(&mut self, device: &CaptureDevice) -> Result<Self::Input, CaptureError>;

    fn begin_configuration(&mut self);

    fn can_add_input(&self, input: &Self::Input) -> bool;

    fn add_input(&mut self, input: Self::Input);

    fn can_add_output(&self) -> bool;

    /// Register the sink frames are pushed to, and where to report a
    /// stream that dies after it started.
    fn add_output(&mut self, sink: FrameCallback, on_failure: FailureCallback);

    /// Unbind and release the input device, if any.
    fn remove_input(&mut self);

    fn remove_output(&mut self);

    fn commit_configuration(&mut self) -> Result<(), CaptureError>;

    /// Start continuous frame delivery on a background thread.
    fn start_running(&mut self) -> Result<(), CaptureError>;

    /// Stop delivery and join the delivery thread. Also reaps a thread
    /// that already ended after reporting a failure.
    fn stop_running(&mut self);
}
