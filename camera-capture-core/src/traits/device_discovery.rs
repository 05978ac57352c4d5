use crate::models::config::DiscoveryFilter;
use crate::models::device::CaptureDevice;
use crate::models::error::CaptureError;

/// Source of the capture devices currently attached.
///
/// Every call queries the hardware again. Implementations may honour the
/// filter natively or ignore it; the registry filters the result either way.
pub trait DeviceDiscovery: Send + Sync {
    fn discover(&self, filter: &DiscoveryFilter) -> Result<Vec<CaptureDevice>, CaptureError>;
}
