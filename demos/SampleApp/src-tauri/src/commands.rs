use std::sync::Arc;

use serde::Serialize;
use tauri::ipc::Channel;
use tauri::{AppHandle, State};

use camera_capture_core::{CaptureDevice, PreviewSurface, SessionSnapshot, Size};

use crate::camera_state::{CameraState, TauriDelegate};
use crate::preview_channel::ChannelRenderer;

// Every command is async so enumeration and joining the capture thread
// never run on the main thread.

/// What the page needs to draw the picker or the preview.
#[derive(Debug, Clone, Serialize)]
pub struct ScreenView {
    pub session: SessionSnapshot,
    pub labels: Vec<String>,
    pub can_start: bool,
    pub shows_preview: bool,
}

/// Enumerate cameras for the picker, in system order.
#[tauri::command]
pub async fn list_cameras(state: State<'_, CameraState>) -> Result<Vec<CaptureDevice>, String> {
    Ok(state.refresh_devices().iter().cloned().collect())
}

/// Bind the camera at `index` of the last listed cameras and start the
/// preview. Frames arrive on `on_frame`, laid out for a `width` x `height`
/// view.
#[tauri::command]
pub async fn start_camera(
    index: usize,
    width: u32,
    height: u32,
    on_frame: Channel,
    app: AppHandle,
    state: State<'_, CameraState>,
) -> Result<SessionSnapshot, String> {
    let mut controller = state.controller.lock();
    let mut picker = state.picker.lock();

    if !picker.select(index) {
        return Err(format!("no camera at index {}", index));
    }
    if !picker.can_start(&controller.snapshot()) {
        return Err("a camera is already running".into());
    }
    if let Some(device) = picker.selected_device() {
        log::info!("Starting preview on {} ({})", device.name, device.id);
    }
    let selection = picker.request_start().ok_or("no camera selected")?;

    controller.set_delegate(TauriDelegate::new(app));
    let surface = PreviewSurface::with_renderer(
        Size::new(width, height),
        state.config.preview,
        Arc::new(ChannelRenderer::new(on_frame)),
    );
    surface.attach(&*controller);

    let started = controller.set_up(selection).and_then(|_| controller.start());
    if let Err(e) = started {
        picker.clear_start_request();
        controller.stop();
        return Err(e.to_string());
    }

    *state.surface.lock() = Some(surface);
    Ok(controller.snapshot())
}

/// Release the camera and go back to the picker. Also the way out after a
/// stream failure.
#[tauri::command]
pub async fn stop_camera(state: State<'_, CameraState>) -> Result<SessionSnapshot, String> {
    let mut controller = state.controller.lock();
    controller.stop();
    *state.surface.lock() = None;
    state.picker.lock().clear_start_request();
    Ok(controller.snapshot())
}

#[tauri::command]
pub async fn session_snapshot(state: State<'_, CameraState>) -> Result<ScreenView, String> {
    let session = state.controller.lock().snapshot();
    let picker = state.picker.lock();
    Ok(ScreenView {
        labels: picker.labels().into_iter().map(String::from).collect(),
        can_start: picker.can_start(&session),
        shows_preview: picker.shows_preview(&session),
        session,
    })
}
