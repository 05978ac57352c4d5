use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::device::CaptureDevice;
use crate::models::error::CaptureError;
use crate::models::frame::{PixelFormat, VideoFrame};
use crate::traits::capture_backend::{CaptureBackend, FailureCallback, FrameCallback};

use super::pattern;
use super::rig::{RigEvent, RigState, VirtualFault};

/// A device opened on the virtual rig.
#[derive(Debug, Clone)]
pub struct VirtualInput {
    device: CaptureDevice,
}

impl VirtualInput {
    pub fn device(&self) -> &CaptureDevice {
        &self.device
    }
}

/// Capture session over a [`VirtualCameraRig`](super::VirtualCameraRig).
///
/// Frames are a moving test pattern produced on a dedicated thread at a
/// fixed interval.
pub struct VirtualBackend {
    rig: Arc<Mutex<RigState>>,
    input: Option<VirtualInput>,
    output: Option<(FrameCallback, FailureCallback)>,
    configuring: bool,
    frame_size: (u32, u32),
    frame_interval: Duration,
    running: Arc<AtomicBool>,
    delivery_handle: Option<thread::JoinHandle<()>>,
}

impl VirtualBackend {
    pub(super) fn new(rig: Arc<Mutex<RigState>>) -> Self {
        Self {
            rig,
            input: None,
            output: None,
            configuring: false,
            frame_size: (320, 240),
            frame_interval: Duration::from_millis(33),
            running: Arc::new(AtomicBool::new(false)),
            delivery_handle: None,
        }
    }

    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = (width, height);
        self
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    fn record(&self, event: RigEvent) {
        self.rig.lock().record(event);
    }

    fn bound_fault(&self) -> Option<VirtualFault> {
        let input = self.input.as_ref()?;
        self.rig.lock().fault_for(&input.device.id)
    }
}

impl CaptureBackend for VirtualBackend {
    type Input = VirtualInput;

    fn open_input(&mut self, device: &CaptureDevice) -> Result<VirtualInput, CaptureError> {
        let fault = {
            let mut rig = self.rig.lock();
            rig.record(RigEvent::OpenInput(device.id.clone()));
            if !rig.is_attached(&device.id) {
                return Err(CaptureError::DeviceNotAvailable);
            }
            rig.fault_for(&device.id)
        };

        match fault {
            Some(VirtualFault::Busy) => Err(CaptureError::DeviceBusy),
            Some(VirtualFault::PermissionDenied) => Err(CaptureError::PermissionDenied),
            Some(VirtualFault::Unavailable) => Err(CaptureError::DeviceNotAvailable),
            _ => Ok(VirtualInput {
                device: device.clone(),
            }),
        }
    }

    fn begin_configuration(&mut self) {
        self.configuring = true;
        self.record(RigEvent::BeginConfiguration);
    }

    fn can_add_input(&self, input: &VirtualInput) -> bool {
        self.input.is_none()
            && self.rig.lock().fault_for(&input.device.id) != Some(VirtualFault::RejectInput)
    }

    fn add_input(&mut self, input: VirtualInput) {
        {
            let mut rig = self.rig.lock();
            rig.record(RigEvent::AddInput(input.device.id.clone()));
            rig.bound_input = Some(input.device.id.clone());
        }
        self.input = Some(input);
    }

    fn can_add_output(&self) -> bool {
        self.output.is_none() && self.bound_fault() != Some(VirtualFault::RejectOutput)
    }

    fn add_output(&mut self, sink: FrameCallback, on_failure: FailureCallback) {
        {
            let mut rig = self.rig.lock();
            rig.record(RigEvent::AddOutput);
            rig.bound_outputs += 1;
        }
        self.output = Some((sink, on_failure));
    }

    fn remove_input(&mut self) {
        if let Some(input) = self.input.take() {
            let mut rig = self.rig.lock();
            rig.record(RigEvent::RemoveInput(input.device.id));
            rig.bound_input = None;
        }
    }

    fn remove_output(&mut self) {
        if self.output.take().is_some() {
            let mut rig = self.rig.lock();
            rig.record(RigEvent::RemoveOutput);
            rig.bound_outputs -= 1;
        }
    }

    fn commit_configuration(&mut self) -> Result<(), CaptureError> {
        self.record(RigEvent::CommitConfiguration);
        self.configuring = false;
        if self.bound_fault() == Some(VirtualFault::CommitFails) {
            return Err(CaptureError::ConfigurationFailed(
                "virtual device refused configuration".into(),
            ));
        }
        Ok(())
    }

    fn start_running(&mut self) -> Result<(), CaptureError> {
        self.record(RigEvent::StartRunning);

        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }
        // a stream that failed on its own leaves a finished thread behind
        if let Some(handle) = self.delivery_handle.take() {
            let _ = handle.join();
        }
        if self.configuring {
            return Err(CaptureError::InvalidState(
                "configuration not committed".into(),
            ));
        }
        let (Some(input), Some((sink, on_failure))) = (self.input.as_ref(), self.output.clone()) else {
            return Err(CaptureError::InvalidState(
                "session needs an input and an output".into(),
            ));
        };
        if self.bound_fault() == Some(VirtualFault::StartFails) {
            return Err(CaptureError::DeviceBusy);
        }

        // one flag per stream so an old thread never sees a new start
        self.running = Arc::new(AtomicBool::new(true));
        let running = Arc::clone(&self.running);
        let rig = Arc::clone(&self.rig);
        let (width, height) = self.frame_size;
        let interval = self.frame_interval;
        let device_id = input.device.id.clone();
        rig.lock().delivering = true;

        let spawned = thread::Builder::new()
            .name("virtual-camera-delivery".into())
            .spawn(move || {
                let mut sequence = 0u64;
                while running.load(Ordering::SeqCst) {
                    if let Some(error) = stream_failure(&rig, &device_id) {
                        running.store(false, Ordering::SeqCst);
                        rig.lock().delivering = false;
                        log::warn!("Virtual camera {} stopped: {}", device_id, error);
                        on_failure(&error);
                        break;
                    }
                    let data = pattern::color_bars(width, height, sequence);
                    let frame = VideoFrame::new(sequence, width, height, PixelFormat::Bgra8, data);
                    sink(&frame);
                    sequence += 1;
                    thread::sleep(interval);
                }
                log::debug!("Virtual camera {} delivered {} frame(s)", device_id, sequence);
            });

        match spawned {
            Ok(handle) => {
                self.delivery_handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                self.rig.lock().delivering = false;
                Err(CaptureError::Unknown(format!(
                    "failed to spawn delivery thread: {}",
                    e
                )))
            }
        }
    }

    fn stop_running(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.delivery_handle.take() {
            let _ = handle.join();
            let mut rig = self.rig.lock();
            rig.record(RigEvent::StopRunning);
            rig.delivering = false;
        }
    }
}

/// Why a running stream on `device_id` has to stop, if it does.
fn stream_failure(rig: &Mutex<RigState>, device_id: &str) -> Option<CaptureError> {
    let rig = rig.lock();
    if !rig.is_attached(device_id) {
        return Some(CaptureError::DeviceDisconnected {
            id: device_id.to_string(),
        });
    }
    match rig.fault_for(device_id) {
        Some(VirtualFault::StreamFails) => Some(CaptureError::DeviceBusy),
        _ => None,
    }
}

impl Drop for VirtualBackend {
    fn drop(&mut self) {
        if self.delivery_handle.is_some() {
            self.stop_running();
        }
    }
}
