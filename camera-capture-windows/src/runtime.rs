//! Per-thread COM and Media Foundation startup.

use std::marker::PhantomData;

use windows::Win32::Foundation::RPC_E_CHANGED_MODE;
use windows::Win32::Media::MediaFoundation::{MFShutdown, MFStartup, MFSTARTUP_FULL, MF_VERSION};
use windows::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT_MULTITHREADED};

use camera_capture_core::models::error::CaptureError;

/// Keeps COM and Media Foundation initialized on the current thread.
///
/// A thread that already joined a single-threaded apartment (a UI thread)
/// is used as is and left initialized on drop.
pub(crate) struct MfRuntime {
    owns_com: bool,
    // COM initialization is per thread
    _not_send: PhantomData<*const ()>,
}

impl MfRuntime {
    pub(crate) fn start() -> Result<Self, CaptureError> {
        unsafe {
            let hr = CoInitializeEx(None, COINIT_MULTITHREADED);
            let owns_com = if hr == RPC_E_CHANGED_MODE {
                false
            } else {
                hr.ok()
                    .map_err(|e| CaptureError::Unknown(format!("CoInitializeEx failed: {}", e)))?;
                true
            };

            if let Err(e) = MFStartup(MF_VERSION, MFSTARTUP_FULL) {
                if owns_com {
                    CoUninitialize();
                }
                return Err(CaptureError::Unknown(format!("MFStartup failed: {}", e)));
            }

            Ok(Self {
                owns_com,
                _not_send: PhantomData,
            })
        }
    }
}

impl Drop for MfRuntime {
    fn drop(&mut self) {
        unsafe {
            let _ = MFShutdown();
            if self.owns_com {
                CoUninitialize();
            }
        }
    }
}
