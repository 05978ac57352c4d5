use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// Category of capture hardware, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceClass {
    BuiltInWideAngle,
    BuiltInUltraWide,
    BuiltInTelephoto,
    ExternalUnknown,
}

/// Which way the device faces. A discovery hint only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePosition {
    Front,
    Back,
    Unspecified,
}

/// Kind of media a device produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    Muxed,
}

/// Snapshot of one capture device taken at enumeration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureDevice {
    pub id: String,
    pub name: String,
    pub device_class: DeviceClass,
    pub position: DevicePosition,
    pub media_kind: MediaKind,
}

/// Ordered result of one enumeration.
///
/// Order is the platform's enumeration order. Each list remembers the
/// registry generation that produced it so selections made from an older
/// list can be told apart from selections made from the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceList {
    devices: Vec<CaptureDevice>,
    generation: u64,
}

impl DeviceList {
    pub fn new(devices: Vec<CaptureDevice>, generation: u64) -> Self {
        Self { devices, generation }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, index: usize) -> Option<&CaptureDevice> {
        self.devices.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CaptureDevice> {
        self.devices.iter()
    }

    /// Fail with [`CaptureError::NoDevicesFound`] if nothing usable is attached.
    ///
    /// There is no fallback source, so callers abort startup on this error.
    pub fn require_devices(self) -> Result<Self, CaptureError> {
        if self.devices.is_empty() {
            return Err(CaptureError::NoDevicesFound);
        }
        Ok(self)
    }

    /// Tag `index` with this list's generation.
    ///
    /// No range check happens here; the controller asserts validity when the
    /// selection is used.
    pub fn select(&self, index: usize) -> SelectionIndex {
        SelectionIndex {
            index,
            generation: self.generation,
        }
    }
}

impl<'a> IntoIterator for &'a DeviceList {
    type Item = &'a CaptureDevice;
    type IntoIter = std::slice::Iter<'a, CaptureDevice>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.iter()
    }
}

/// A position in a specific [`DeviceList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectionIndex {
    index: usize,
    generation: u64,
}

impl SelectionIndex {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
