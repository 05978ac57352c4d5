use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::config::DiscoveryFilter;
use crate::models::device::CaptureDevice;
use crate::models::error::CaptureError;
use crate::traits::device_discovery::DeviceDiscovery;

use super::backend::VirtualBackend;

/// Failure a virtual device injects into the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtualFault {
    /// `open_input` fails with `DeviceBusy`.
    Busy,
    /// `open_input` fails with `PermissionDenied`.
    PermissionDenied,
    /// `open_input` fails with `DeviceNotAvailable`.
    Unavailable,
    /// `can_add_input` refuses the opened device.
    RejectInput,
    /// `can_add_output` refuses the sink while this device is bound.
    RejectOutput,
    /// `commit_configuration` fails while this device is bound.
    CommitFails,
    /// `start_running` fails with `DeviceBusy`.
    StartFails,
    /// A running stream stops and reports `DeviceBusy`.
    StreamFails,
}

/// Most recent backend calls the rig keeps; older ones are dropped.
pub const EVENT_LOG_CAPACITY: usize = 1024;

/// Backend call, recorded in order for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RigEvent {
    Discover,
    OpenInput(String),
    BeginConfiguration,
    AddInput(String),
    AddOutput,
    RemoveInput(String),
    RemoveOutput,
    CommitConfiguration,
    StartRunning,
    StopRunning,
}

#[derive(Debug, Clone)]
struct VirtualDevice {
    device: CaptureDevice,
    fault: Option<VirtualFault>,
}

#[derive(Debug, Default)]
pub(super) struct RigState {
    devices: Vec<VirtualDevice>,
    events: VecDeque<RigEvent>,
    pub(super) bound_input: Option<String>,
    pub(super) bound_outputs: usize,
    pub(super) delivering: bool,
}

impl RigState {
    pub(super) fn record(&mut self, event: RigEvent) {
        if self.events.len() == EVENT_LOG_CAPACITY {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub(super) fn fault_for(&self, id: &str) -> Option<VirtualFault> {
        self.devices
            .iter()
            .find(|d| d.device.id == id)
            .and_then(|d| d.fault)
    }

    pub(super) fn is_attached(&self, id: &str) -> bool {
        self.devices.iter().any(|d| d.device.id == id)
    }
}

/// Simulated camera hardware.
///
/// Cloning shares the same hardware, so a test can keep a handle to plug
/// and unplug devices after handing discovery to a registry and the
/// backend to a controller.
#[derive(Debug, Clone, Default)]
pub struct VirtualCameraRig {
    state: Arc<Mutex<RigState>>,
}

impl VirtualCameraRig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a device. It goes to the end of the enumeration order.
    pub fn plug(&self, device: CaptureDevice) {
        self.state.lock().devices.push(VirtualDevice { device, fault: None });
    }

    /// Detach a device. Returns whether it was attached.
    pub fn unplug(&self, id: &str) -> bool {
        let mut state = self.state.lock();
        let before = state.devices.len();
        state.devices.retain(|d| d.device.id != id);
        state.devices.len() < before
    }

    /// Make `id` fail with `fault` from now on (`None` clears it).
    pub fn set_fault(&self, id: &str, fault: Option<VirtualFault>) {
        let mut state = self.state.lock();
        if let Some(device) = state.devices.iter_mut().find(|d| d.device.id == id) {
            device.fault = fault;
        }
    }

    /// A capture session on this hardware.
    pub fn backend(&self) -> VirtualBackend {
        VirtualBackend::new(Arc::clone(&self.state))
    }

    /// Backend calls in order, up to [`EVENT_LOG_CAPACITY`] of the latest.
    pub fn events(&self) -> Vec<RigEvent> {
        self.state.lock().events.iter().cloned().collect()
    }

    pub fn clear_events(&self) {
        self.state.lock().events.clear();
    }

    /// Id of the device bound as session input, if any.
    pub fn bound_input(&self) -> Option<String> {
        self.state.lock().bound_input.clone()
    }

    pub fn bound_inputs(&self) -> usize {
        usize::from(self.state.lock().bound_input.is_some())
    }

    pub fn bound_outputs(&self) -> usize {
        self.state.lock().bound_outputs
    }

    pub fn is_delivering(&self) -> bool {
        self.state.lock().delivering
    }
}

impl DeviceDiscovery for VirtualCameraRig {
    /// Reports every attached device; the filter is left to the registry.
    fn discover(&self, _filter: &DiscoveryFilter) -> Result<Vec<CaptureDevice>, CaptureError> {
        let mut state = self.state.lock();
        state.record(RigEvent::Discover);
        Ok(state.devices.iter().map(|d| d.device.clone()).collect())
    }
}
