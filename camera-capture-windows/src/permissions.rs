//! Windows camera privacy permission check.
//!
//! On Windows 10 1803+, camera access is controlled by the privacy
//! settings at Settings > Privacy > Camera. Desktop apps are allowed unless
//! the user has turned off "Let desktop apps access your camera" or the
//! global toggle.
//!
//! Unpackaged desktop apps get no consent dialog; a blocked camera simply
//! fails to activate with `E_ACCESSDENIED`.

use windows::Win32::Media::MediaFoundation::IMFMediaSource;

use camera_capture_core::models::error::CaptureError;

use crate::convert;
use crate::device_enumerator::enum_video_sources;
use crate::runtime::MfRuntime;

/// Check if camera access is available.
///
/// Activates the first attached camera and shuts it down again. Returns
/// `Ok(false)` if there is no camera or access is denied. A camera that is
/// merely in use by another app still counts as permitted.
pub fn check_camera_permission() -> Result<bool, CaptureError> {
    let _runtime = MfRuntime::start()?;

    unsafe {
        let sources = enum_video_sources()?;
        let Some(first) = sources.first() else {
            return Ok(false);
        };

        match first.ActivateObject::<IMFMediaSource>() {
            Ok(source) => {
                let _ = source.Shutdown();
                let _ = first.ShutdownObject();
                Ok(true)
            }
            Err(e) => match convert::capture_error(e.code().0) {
                CaptureError::PermissionDenied => Ok(false),
                CaptureError::DeviceBusy => Ok(true),
                other => {
                    log::warn!("Unexpected error checking camera permission: {} ({})", e, other);
                    Ok(true)
                }
            },
        }
    }
}
