use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tauri::{AppHandle, Emitter};

use camera_capture_core::{
    CaptureDevice, CaptureError, CaptureSessionController, DeviceList, DevicePicker, DeviceRegistry,
    PreviewSurface, SessionConfiguration, SessionDelegate, SessionState,
};

#[cfg(target_os = "windows")]
pub type Backend = camera_capture_windows::MediaFoundationBackend;
#[cfg(not(target_os = "windows"))]
pub type Backend = camera_capture_core::virtual_camera::VirtualBackend;

pub type Controller = CaptureSessionController<Backend>;

/// Tauri-managed state: the one capture session plus the picker UI state.
pub struct CameraState {
    pub config: SessionConfiguration,
    pub controller: Mutex<Controller>,
    pub picker: Mutex<DevicePicker>,
    pub surface: Mutex<Option<PreviewSurface>>,
}

impl CameraState {
    pub fn new(config: SessionConfiguration) -> Self {
        let (discovery, backend) = platform();
        let registry = Arc::new(DeviceRegistry::new(discovery, config.filter));
        let controller = CaptureSessionController::new(registry, backend);
        Self {
            config,
            controller: Mutex::new(controller),
            picker: Mutex::new(DevicePicker::new(DeviceList::new(Vec::new(), 0))),
            surface: Mutex::new(None),
        }
    }

    /// Query the hardware and reset the picker to the fresh list.
    ///
    /// Holds the controller lock until the picker is replaced, taking the
    /// locks in the same order as `start_camera`, so no start can pair the
    /// new registry generation with the old picker.
    pub fn refresh_devices(&self) -> DeviceList {
        let controller = self.controller.lock();
        let devices = controller.registry().enumerate();
        *self.picker.lock() = DevicePicker::new(devices.clone());
        devices
    }
}

#[cfg(target_os = "windows")]
fn platform() -> (Arc<dyn camera_capture_core::DeviceDiscovery>, Backend) {
    use camera_capture_windows::{check_camera_permission, MediaFoundationBackend, MediaFoundationDiscovery};

    match check_camera_permission() {
        Ok(true) => {}
        Ok(false) => log::warn!("Camera access is off in Settings > Privacy > Camera"),
        Err(e) => log::warn!("Could not check camera permission: {}", e),
    }
    (Arc::new(MediaFoundationDiscovery::new()), MediaFoundationBackend::new())
}

/// Two simulated cameras so the sample runs without Media Foundation.
#[cfg(not(target_os = "windows"))]
fn platform() -> (Arc<dyn camera_capture_core::DeviceDiscovery>, Backend) {
    use camera_capture_core::virtual_camera::VirtualCameraRig;
    use camera_capture_core::{DeviceClass, DevicePosition, MediaKind};

    let rig = VirtualCameraRig::new();
    rig.plug(CaptureDevice {
        id: "virtual-builtin".into(),
        name: "Built-in Camera (virtual)".into(),
        device_class: DeviceClass::BuiltInWideAngle,
        position: DevicePosition::Front,
        media_kind: MediaKind::Video,
    });
    rig.plug(CaptureDevice {
        id: "virtual-usb".into(),
        name: "USB Camera (virtual)".into(),
        device_class: DeviceClass::ExternalUnknown,
        position: DevicePosition::Unspecified,
        media_kind: MediaKind::Video,
    });
    let backend = rig.backend().with_frame_size(640, 480);
    (Arc::new(rig), backend)
}

/// SessionDelegate that forwards events to the web view via Tauri events.
pub struct TauriDelegate {
    app: AppHandle,
}

impl TauriDelegate {
    pub fn new(app: AppHandle) -> Arc<Self> {
        Arc::new(Self { app })
    }
}

// -- Event payloads --

#[derive(Clone, Serialize)]
struct ErrorPayload {
    message: String,
    recoverable: bool,
}

#[derive(Clone, Serialize)]
struct DeliveryStartedPayload {
    device_id: String,
    device_name: String,
}

impl SessionDelegate for TauriDelegate {
    fn on_state_changed(&self, state: &SessionState) {
        let _ = self.app.emit("camera://state-changed", *state);
    }

    fn on_error(&self, error: &CaptureError) {
        let _ = self.app.emit(
            "camera://error",
            ErrorPayload {
                message: error.to_string(),
                recoverable: error.is_recoverable(),
            },
        );
    }

    fn on_delivery_started(&self, device: &CaptureDevice) {
        let _ = self.app.emit(
            "camera://delivery-started",
            DeliveryStartedPayload {
                device_id: device.id.clone(),
                device_name: device.name.clone(),
            },
        );
    }
}
