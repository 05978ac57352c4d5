//! Conversions from Media Foundation data into core types.
//!
//! Kept free of `windows` types so the rules are testable on any host.

#![cfg_attr(not(target_os = "windows"), allow(dead_code))]

use std::sync::Arc;

use camera_capture_core::models::device::{DeviceClass, DevicePosition};
use camera_capture_core::models::error::CaptureError;

const E_ACCESSDENIED: i32 = 0x8007_0005_u32 as i32;
const HRESULT_SHARING_VIOLATION: i32 = 0x8007_0020_u32 as i32;
const HRESULT_DEVICE_NOT_CONNECTED: i32 = 0x8007_048F_u32 as i32;
const MF_E_HW_MFT_FAILED_START_STREAMING: i32 = 0xC00D_3704_u32 as i32;
const MF_E_VIDEO_RECORDING_DEVICE_INVALIDATED: i32 = 0xC00D_ABE0_u32 as i32;
const MF_E_VIDEO_RECORDING_DEVICE_PREEMPTED: i32 = 0xC00D_ABE1_u32 as i32;

/// Map an HRESULT from opening or reading a camera onto a recoverable error.
pub fn capture_error(code: i32) -> CaptureError {
    match code {
        // camera privacy switch off, or app blocked in Settings > Privacy > Camera
        E_ACCESSDENIED => CaptureError::PermissionDenied,
        HRESULT_SHARING_VIOLATION
        | MF_E_HW_MFT_FAILED_START_STREAMING
        | MF_E_VIDEO_RECORDING_DEVICE_PREEMPTED => CaptureError::DeviceBusy,
        HRESULT_DEVICE_NOT_CONNECTED | MF_E_VIDEO_RECORDING_DEVICE_INVALIDATED => {
            CaptureError::DeviceNotAvailable
        }
        other => {
            log::warn!("Unmapped Media Foundation error 0x{:08X}", other as u32);
            CaptureError::DeviceNotAvailable
        }
    }
}

/// Guess class and facing from what Media Foundation reports.
///
/// Windows does not expose lens type to desktop apps. Cameras on an
/// internal bus, or whose name says "integrated", are treated as the
/// built-in front camera; everything else is external.
pub fn device_kind(name: &str, symbolic_link: &str) -> (DeviceClass, DevicePosition) {
    let name = name.to_lowercase();
    let link = symbolic_link.to_lowercase();

    let internal_bus = link.starts_with(r"\\?\acpi#") || link.contains("mipi") || link.contains("#intc");
    let named_builtin = ["integrated", "built-in", "internal", "front camera", "facetime"]
        .iter()
        .any(|hint| name.contains(hint));

    if internal_bus || named_builtin {
        (DeviceClass::BuiltInWideAngle, DevicePosition::Front)
    } else {
        (DeviceClass::ExternalUnknown, DevicePosition::Unspecified)
    }
}

/// Copy an RGB32 buffer into tightly packed top-down BGRA.
///
/// `stride` is `MF_MT_DEFAULT_STRIDE`: negative for bottom-up images.
/// The unused fourth byte of RGB32 is set opaque. Returns `None` if
/// `data` is too short for the geometry.
pub fn packed_bgra(data: &[u8], width: u32, height: u32, stride: i32) -> Option<Arc<[u8]>> {
    let row_bytes = width as usize * 4;
    let pitch = stride.unsigned_abs() as usize;
    let height = height as usize;
    if pitch < row_bytes || data.len() < pitch * height.saturating_sub(1) + row_bytes {
        return None;
    }

    let mut out = Vec::with_capacity(row_bytes * height);
    for row in 0..height {
        let src_row = if stride < 0 { height - 1 - row } else { row };
        let start = src_row * pitch;
        out.extend_from_slice(&data[start..start + row_bytes]);
    }
    for pixel in out.chunks_exact_mut(4) {
        pixel[3] = 0xFF;
    }
    Some(out.into())
}
