//! # camera-capture-core
//!
//! Platform-agnostic camera capture core library.
//!
//! Discovers capture devices, binds the selected one into a single capture
//! session, and fans the session's frames out to preview surfaces.
//! Platform-specific backends (Windows Media Foundation, the in-memory
//! virtual camera) implement `DeviceDiscovery` and `CaptureBackend` and plug
//! into the generic `CaptureSessionController`.
//!
//! ## Architecture
//!
//! ```text
//! camera-capture-core (this crate)
//! ├── traits/         ← DeviceDiscovery, CaptureBackend, SessionDelegate, FrameRenderer
//! ├── models/         ← CaptureDevice, DeviceList, CaptureError, SessionState, config
//! ├── registry/       ← DeviceRegistry
//! ├── session/        ← CaptureSessionController, FrameFanout
//! ├── preview/        ← PreviewSurface, aspect-fill layout
//! ├── presentation/   ← DevicePicker
//! └── virtual_camera/ ← in-memory hardware for tests and demos
//! ```
//!
//! ## Usage
//! ```ignore
//! let registry = Arc::new(DeviceRegistry::new(discovery, DiscoveryFilter::DEFAULT));
//! let devices = registry.enumerate().require_devices()?;
//! let mut controller = CaptureSessionController::new(registry, backend);
//! let surface = PreviewSurface::new(Size::new(1920, 1080), PreviewOptions::default());
//! surface.attach(&controller);
//! controller.set_up(devices.select(0))?;
//! controller.start()?;
//! ```

pub mod models;
pub mod presentation;
pub mod preview;
pub mod registry;
pub mod session;
pub mod traits;
pub mod virtual_camera;

// Re-export key types at crate root for convenience.
pub use models::config::{DiscoveryFilter, PreviewOptions, SessionConfiguration, VideoGravity};
pub use models::device::{CaptureDevice, DeviceClass, DeviceList, DevicePosition, MediaKind, SelectionIndex};
pub use models::error::CaptureError;
pub use models::frame::{PixelFormat, VideoFrame};
pub use models::state::{SessionDiagnostics, SessionSnapshot, SessionState};
pub use presentation::device_picker::DevicePicker;
pub use preview::layout::{PreviewLayout, Rect, Size};
pub use preview::surface::PreviewSurface;
pub use registry::device_registry::DeviceRegistry;
pub use session::controller::{CaptureSessionController, SessionMonitor};
pub use session::fanout::{FrameFanout, FrameObserver};
pub use traits::capture_backend::{CaptureBackend, FailureCallback, FrameCallback};
pub use traits::device_discovery::DeviceDiscovery;
pub use traits::frame_renderer::FrameRenderer;
pub use traits::session_delegate::SessionDelegate;
