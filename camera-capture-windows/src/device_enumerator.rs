//! Video capture device enumeration via Media Foundation.
//!
//! Wraps `MFEnumDeviceSources` with the video-capture source type to list
//! cameras with their friendly names and symbolic links. The symbolic
//! link is stable for as long as the device stays attached and is used
//! as the device id.

use std::ffi::c_void;

use windows::core::{GUID, HSTRING, PCWSTR, PWSTR};
use windows::Win32::Media::MediaFoundation::*;
use windows::Win32::System::Com::CoTaskMemFree;

use camera_capture_core::models::config::DiscoveryFilter;
use camera_capture_core::models::device::{CaptureDevice, MediaKind};
use camera_capture_core::models::error::CaptureError;
use camera_capture_core::traits::device_discovery::DeviceDiscovery;

use crate::convert;
use crate::runtime::MfRuntime;

/// Camera discovery backed by Media Foundation.
///
/// Initializes COM and Media Foundation for the duration of each call, so
/// it can be used from any thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct MediaFoundationDiscovery;

impl MediaFoundationDiscovery {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceDiscovery for MediaFoundationDiscovery {
    fn discover(&self, filter: &DiscoveryFilter) -> Result<Vec<CaptureDevice>, CaptureError> {
        if filter.media_kind != MediaKind::Video {
            return Ok(Vec::new());
        }

        let _runtime = MfRuntime::start()?;
        let sources = unsafe { enum_video_sources() }?;

        let mut devices = Vec::with_capacity(sources.len());
        for (i, source) in sources.iter().enumerate() {
            let symbolic_link = match unsafe {
                allocated_string(source, &MF_DEVSOURCE_ATTRIBUTE_SOURCE_TYPE_VIDCAP_SYMBOLIC_LINK)
            } {
                Some(link) => link,
                None => {
                    log::warn!("Skipping video source {} without a symbolic link", i);
                    continue;
                }
            };
            let name = unsafe { allocated_string(source, &MF_DEVSOURCE_ATTRIBUTE_FRIENDLY_NAME) }
                .unwrap_or_else(|| format!("Camera {}", i + 1));

            let (device_class, position) = convert::device_kind(&name, &symbolic_link);
            devices.push(CaptureDevice {
                id: symbolic_link,
                name,
                device_class,
                position,
                media_kind: MediaKind::Video,
            });
        }

        log::debug!("Media Foundation reported {} video source(s)", devices.len());
        Ok(devices)
    }
}

/// Attribute store selecting video capture sources.
pub(crate) unsafe fn video_source_attributes() -> Result<IMFAttributes, CaptureError> {
    let mut attributes: Option<IMFAttributes> = None;
    MFCreateAttributes(&mut attributes, 2)
        .map_err(|e| CaptureError::Unknown(format!("MFCreateAttributes failed: {}", e)))?;
    let attributes = attributes
        .ok_or_else(|| CaptureError::Unknown("MFCreateAttributes returned no store".into()))?;
    attributes
        .SetGUID(
            &MF_DEVSOURCE_ATTRIBUTE_SOURCE_TYPE,
            &MF_DEVSOURCE_ATTRIBUTE_SOURCE_TYPE_VIDCAP_GUID,
        )
        .map_err(|e| CaptureError::Unknown(format!("SetGUID failed: {}", e)))?;
    Ok(attributes)
}

/// Create the media source for the camera at `symbolic_link`.
///
/// This is where a blocked camera (privacy settings) or a vanished one
/// shows up.
pub(crate) unsafe fn create_device_source(symbolic_link: &str) -> Result<IMFMediaSource, CaptureError> {
    let attributes = video_source_attributes()?;
    let link = HSTRING::from(symbolic_link);
    attributes
        .SetString(
            &MF_DEVSOURCE_ATTRIBUTE_SOURCE_TYPE_VIDCAP_SYMBOLIC_LINK,
            PCWSTR(link.as_ptr()),
        )
        .map_err(|e| CaptureError::Unknown(format!("SetString failed: {}", e)))?;

    MFCreateDeviceSource(&attributes).map_err(|e| {
        log::warn!("MFCreateDeviceSource failed for {}: {}", symbolic_link, e);
        convert::capture_error(e.code().0)
    })
}

/// Activation objects for every attached camera, in system order.
pub(crate) unsafe fn enum_video_sources() -> Result<Vec<IMFActivate>, CaptureError> {
    let attributes = video_source_attributes()?;
    let mut sources: *mut Option<IMFActivate> = std::ptr::null_mut();
    let mut count: u32 = 0;
    MFEnumDeviceSources(&attributes, &mut sources, &mut count)
        .map_err(|e| CaptureError::Unknown(format!("MFEnumDeviceSources failed: {}", e)))?;

    if sources.is_null() {
        return Ok(Vec::new());
    }
    // take ownership of each reference, then free the array itself
    let activates = std::slice::from_raw_parts_mut(sources, count as usize)
        .iter_mut()
        .filter_map(Option::take)
        .collect();
    CoTaskMemFree(Some(sources as *const c_void));
    Ok(activates)
}

unsafe fn allocated_string(source: &IMFActivate, key: &GUID) -> Option<String> {
    let mut value = PWSTR::null();
    let mut len: u32 = 0;
    source.GetAllocatedString(key, &mut value, &mut len).ok()?;
    let result = value.to_string().ok();
    CoTaskMemFree(Some(value.0 as *const c_void));
    result
}
