//! In-memory camera hardware.
//!
//! Devices can be plugged, unplugged and told to fail at any step of the
//! configuration transaction. Delivery pushes a synthetic color-bar
//! pattern, so the whole pipeline runs on machines without a camera.

mod backend;
mod pattern;
mod rig;

pub use backend::{VirtualBackend, VirtualInput};
pub use rig::{RigEvent, VirtualCameraRig, VirtualFault, EVENT_LOG_CAPACITY};
