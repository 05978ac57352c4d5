//! # camera-capture-windows
//!
//! Windows Media Foundation backend for camera-capture-kit.
//!
//! Provides:
//! - `MediaFoundationDiscovery`: camera enumeration via `MFEnumDeviceSources`
//! - `MediaFoundationBackend`: capture session reading RGB32 frames through
//!   a source reader on a dedicated thread
//! - `permissions`: Windows camera privacy check
//! - `worker`: capture thread with a per-stream run flag
//!
//! ## Platform Requirements
//! - Windows 10 1803+ for the camera privacy settings
//! - Visual Studio Build Tools 2022 + Windows SDK for linking
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use camera_capture_core::{CaptureSessionController, DeviceRegistry, DiscoveryFilter};
//! use camera_capture_windows::{MediaFoundationBackend, MediaFoundationDiscovery};
//!
//! let registry = Arc::new(DeviceRegistry::new(
//!     Arc::new(MediaFoundationDiscovery::new()),
//!     DiscoveryFilter::DEFAULT,
//! ));
//! let mut controller = CaptureSessionController::new(registry, MediaFoundationBackend::new());
//! ```

pub mod convert;
#[cfg(target_os = "windows")]
pub mod device_enumerator;
#[cfg(target_os = "windows")]
pub mod media_foundation;
#[cfg(target_os = "windows")]
pub mod permissions;
#[cfg(target_os = "windows")]
mod runtime;
pub mod worker;

#[cfg(target_os = "windows")]
pub use device_enumerator::MediaFoundationDiscovery;
#[cfg(target_os = "windows")]
pub use media_foundation::{MediaFoundationBackend, MediaFoundationInput};
#[cfg(target_os = "windows")]
pub use permissions::check_camera_permission;
