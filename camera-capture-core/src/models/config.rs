use serde::{Deserialize, Serialize};

use super::device::{CaptureDevice, DeviceClass, DevicePosition, MediaKind};

/// Which devices discovery reports.
///
/// Shared by the registry's filtering and the controller's bind-time
/// revalidation, so both always agree on what counts as a usable camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryFilter {
    /// Accepted device classes.
    pub device_classes: &'static [DeviceClass],

    /// Accepted media kind.
    pub media_kind: MediaKind,

    /// Passed to the platform as a preference. Not used to drop devices.
    pub position_hint: DevicePosition,
}

impl DiscoveryFilter {
    pub const DEFAULT: Self = Self {
        device_classes: &[DeviceClass::BuiltInWideAngle, DeviceClass::ExternalUnknown],
        media_kind: MediaKind::Video,
        position_hint: DevicePosition::Front,
    };

    pub fn accepts(&self, device: &CaptureDevice) -> bool {
        self.device_classes.contains(&device.device_class) && device.media_kind == self.media_kind
    }
}

impl Default for DiscoveryFilter {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// How frames are scaled into the preview bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VideoGravity {
    /// Fill the bounds, preserving aspect ratio, cropping the overflow.
    AspectFill,
    /// Fit inside the bounds, preserving aspect ratio, letterboxing.
    AspectFit,
    /// Stretch to the bounds.
    Resize,
}

/// Presentation policy of a preview surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewOptions {
    pub gravity: VideoGravity,

    /// Mirror horizontally. Only honoured while automatic mirroring is off.
    pub mirrored: bool,

    /// Let the surface mirror front-facing cameras on its own.
    pub automatically_adjusts_mirroring: bool,
}

impl PreviewOptions {
    /// Mirroring actually applied for a source facing `position`.
    pub fn effective_mirroring(&self, position: DevicePosition) -> bool {
        if self.automatically_adjusts_mirroring {
            position == DevicePosition::Front
        } else {
            self.mirrored
        }
    }
}

impl Default for PreviewOptions {
    /// Aspect-fill, always mirrored, regardless of which way the camera faces.
    fn default() -> Self {
        Self {
            gravity: VideoGravity::AspectFill,
            mirrored: true,
            automatically_adjusts_mirroring: false,
        }
    }
}

/// Configuration for device discovery and preview presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionConfiguration {
    /// Filter handed to the device registry.
    pub filter: DiscoveryFilter,

    /// Policy for every preview surface attached to the session.
    pub preview: PreviewOptions,
}

impl SessionConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.filter.device_classes.is_empty() {
            return Err("discovery filter accepts no device classes".into());
        }
        if self.filter.media_kind != MediaKind::Video {
            return Err(format!(
                "unsupported media kind: {:?}",
                self.filter.media_kind
            ));
        }
        if self.preview.automatically_adjusts_mirroring && self.preview.mirrored {
            return Err("mirrored has no effect while automatic mirroring is enabled".into());
        }
        Ok(())
    }
}
