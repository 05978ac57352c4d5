pub mod capture_backend;
pub mod device_discovery;
pub mod frame_renderer;
pub mod session_delegate;
