use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::config::DiscoveryFilter;
use crate::models::device::{CaptureDevice, DeviceList};
use crate::traits::device_discovery::DeviceDiscovery;

/// Identity of the most recent list handed out by [`DeviceRegistry::enumerate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumerationRecord {
    /// 0 until the first enumeration.
    pub generation: u64,
    pub device_ids: Vec<String>,
}

/// Answers "which capture devices matching the filter exist right now?".
///
/// Nothing is cached: every call goes back to the platform. The registry
/// never fails; a platform error is logged and reported as an empty list,
/// which callers already treat as fatal.
pub struct DeviceRegistry {
    discovery: Arc<dyn DeviceDiscovery>,
    filter: DiscoveryFilter,
    latest: Mutex<EnumerationRecord>,
}

impl DeviceRegistry {
    pub fn new(discovery: Arc<dyn DeviceDiscovery>, filter: DiscoveryFilter) -> Self {
        Self {
            discovery,
            filter,
            latest: Mutex::new(EnumerationRecord::default()),
        }
    }

    pub fn filter(&self) -> &DiscoveryFilter {
        &self.filter
    }

    /// Enumerate devices and record the result as the current list.
    pub fn enumerate(&self) -> DeviceList {
        let devices = self.query();
        let mut latest = self.latest.lock();
        latest.generation += 1;
        latest.device_ids = devices.iter().map(|d| d.id.clone()).collect();
        log::info!(
            "Enumerated {} capture device(s) (generation {})",
            devices.len(),
            latest.generation
        );
        DeviceList::new(devices, latest.generation)
    }

    /// Query the hardware without replacing the recorded list.
    ///
    /// Used at bind time to check a selected device is still attached.
    pub fn probe(&self) -> Vec<CaptureDevice> {
        self.query()
    }

    /// The list most recently returned by [`enumerate`](Self::enumerate).
    pub fn latest(&self) -> EnumerationRecord {
        self.latest.lock().clone()
    }

    fn query(&self) -> Vec<CaptureDevice> {
        let devices = match self.discovery.discover(&self.filter) {
            Ok(devices) => devices,
            Err(e) => {
                log::warn!("Device discovery failed: {}", e);
                return Vec::new();
            }
        };

        let total = devices.len();
        let accepted: Vec<CaptureDevice> = devices
            .into_iter()
            .filter(|d| self.filter.accepts(d))
            .collect();
        if accepted.len() < total {
            log::debug!(
                "Discovery filter dropped {} of {} device(s)",
                total - accepted.len(),
                total
            );
        }
        accepted
    }
}
