//! Media Foundation capture session.
//!
//! Opens the camera as a media source, reads RGB32 frames through a
//! source reader with video processing enabled, and pushes them to the
//! session output on a dedicated thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use windows::Win32::Media::MediaFoundation::*;

use camera_capture_core::models::device::CaptureDevice;
use camera_capture_core::models::error::CaptureError;
use camera_capture_core::models::frame::{PixelFormat, VideoFrame};
use camera_capture_core::traits::capture_backend::{CaptureBackend, FailureCallback, FrameCallback};

use crate::convert;
use crate::device_enumerator::create_device_source;
use crate::runtime::MfRuntime;
use crate::worker::CaptureWorker;

/// How long `start_running` waits for the camera's first frame.
const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

const FIRST_VIDEO_STREAM: u32 = MF_SOURCE_READER_FIRST_VIDEO_STREAM.0 as u32;

/// A camera that Media Foundation agreed to open.
#[derive(Debug, Clone)]
pub struct MediaFoundationInput {
    device: CaptureDevice,
}

impl MediaFoundationInput {
    pub fn device(&self) -> &CaptureDevice {
        &self.device
    }
}

/// Capture session on Media Foundation.
///
/// All COM objects live on the capture thread; the struct itself only
/// holds plain data and the capture worker.
pub struct MediaFoundationBackend {
    input: Option<MediaFoundationInput>,
    output: Option<(FrameCallback, FailureCallback)>,
    configuring: bool,
    worker: Option<CaptureWorker>,
}

impl MediaFoundationBackend {
    pub fn new() -> Self {
        Self {
            input: None,
            output: None,
            configuring: false,
            worker: None,
        }
    }
}

impl Default for MediaFoundationBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for MediaFoundationBackend {
    type Input = MediaFoundationInput;

    fn open_input(&mut self, device: &CaptureDevice) -> Result<MediaFoundationInput, CaptureError> {
        let _runtime = MfRuntime::start()?;
        // creating the source surfaces privacy blocks and unplugged devices
        // now; the capture thread opens its own source later
        let source = unsafe { create_device_source(&device.id) }?;
        unsafe {
            let _ = source.Shutdown();
        }
        log::debug!("Opened camera {}", device.name);
        Ok(MediaFoundationInput {
            device: device.clone(),
        })
    }

    fn begin_configuration(&mut self) {
        self.configuring = true;
    }

    fn can_add_input(&self, _input: &MediaFoundationInput) -> bool {
        self.input.is_none()
    }

    fn add_input(&mut self, input: MediaFoundationInput) {
        self.input = Some(input);
    }

    fn can_add_output(&self) -> bool {
        self.output.is_none()
    }

    fn add_output(&mut self, sink: FrameCallback, on_failure: FailureCallback) {
        self.output = Some((sink, on_failure));
    }

    fn remove_input(&mut self) {
        self.input = None;
    }

    fn remove_output(&mut self) {
        self.output = None;
    }

    fn commit_configuration(&mut self) -> Result<(), CaptureError> {
        self.configuring = false;
        Ok(())
    }

    fn start_running(&mut self) -> Result<(), CaptureError> {
        if self.worker.as_ref().is_some_and(CaptureWorker::is_running) {
            return Ok(());
        }
        if self.configuring {
            return Err(CaptureError::InvalidState("configuration not committed".into()));
        }
        let (Some(input), Some((sink, on_failure))) = (self.input.as_ref(), self.output.clone())
        else {
            return Err(CaptureError::InvalidState(
                "session needs an input and an output".into(),
            ));
        };
        // reap a capture thread that ended on its own or was abandoned
        if let Some(worker) = self.worker.take() {
            worker.stop();
        }

        let symbolic_link = input.device.id.clone();
        let (ready_tx, ready_rx) = mpsc::channel();

        let worker = CaptureWorker::spawn("mf-camera-capture", move |running| {
            capture_loop(running, &symbolic_link, sink, on_failure, ready_tx);
        })
        .map_err(|e| CaptureError::Unknown(format!("failed to spawn capture thread: {}", e)))?;

        match ready_rx.recv_timeout(FIRST_FRAME_TIMEOUT) {
            Ok(Ok(())) => {
                self.worker = Some(worker);
                log::info!("Camera capture started on {}", input.device.name);
                Ok(())
            }
            Ok(Err(e)) => {
                worker.stop();
                Err(e)
            }
            Err(RecvTimeoutError::Timeout) => {
                // the read may block a while longer; stop_running or the
                // next start joins the thread once it returns
                worker.signal_stop();
                self.worker = Some(worker);
                log::warn!("No frame from {} within {:?}", input.device.name, FIRST_FRAME_TIMEOUT);
                Err(CaptureError::DeviceNotAvailable)
            }
            Err(RecvTimeoutError::Disconnected) => {
                worker.stop();
                Err(CaptureError::Unknown(
                    "capture thread exited before the first frame".into(),
                ))
            }
        }
    }

    fn stop_running(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop();
        }
    }
}

impl Drop for MediaFoundationBackend {
    fn drop(&mut self) {
        self.stop_running();
    }
}

/// Frame geometry of the reader's current output type.
struct FrameGeometry {
    width: u32,
    height: u32,
    stride: i32,
}

/// Capture loop running on a dedicated thread.
///
/// Sequence:
/// 1. COM + MFStartup
/// 2. Media source for the camera's symbolic link
/// 3. Source reader with video processing, output type RGB32
/// 4. Blocking `ReadSample` until the run flag clears
///
/// The first frame, or the first error, is reported through `ready`.
/// A later error goes to `on_failure` unless the stream was being stopped.
fn capture_loop(
    running: &AtomicBool,
    symbolic_link: &str,
    sink: FrameCallback,
    on_failure: FailureCallback,
    ready: mpsc::Sender<Result<(), CaptureError>>,
) {
    let opened = MfRuntime::start().and_then(|runtime| {
        let reader = unsafe { open_reader(symbolic_link) }?;
        let geometry = unsafe { current_geometry(&reader) }?;
        Ok((runtime, reader, geometry))
    });
    let (_runtime, reader, mut geometry) = match opened {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    let mut ready = Some(ready);
    let mut sequence = 0u64;
    while running.load(Ordering::SeqCst) {
        match unsafe { read_frame(&reader, &mut geometry, sequence) } {
            // stopped while the read was pending
            _ if !running.load(Ordering::SeqCst) => break,
            Ok(Some(frame)) => {
                if let Some(ready) = ready.take() {
                    let _ = ready.send(Ok(()));
                }
                sink(&frame);
                sequence += 1;
            }
            Ok(None) => {}
            Err(e) => {
                match ready.take() {
                    Some(ready) => {
                        let _ = ready.send(Err(e));
                    }
                    None => {
                        log::error!("Camera capture stopped: {}", e);
                        running.store(false, Ordering::SeqCst);
                        on_failure(&e);
                    }
                }
                break;
            }
        }
    }

    drop(reader);
    log::debug!("Capture thread for {} delivered {} frame(s)", symbolic_link, sequence);
}

unsafe fn open_reader(symbolic_link: &str) -> Result<IMFSourceReader, CaptureError> {
    let source = create_device_source(symbolic_link)?;

    let mut attributes: Option<IMFAttributes> = None;
    MFCreateAttributes(&mut attributes, 1)
        .map_err(|e| CaptureError::Unknown(format!("MFCreateAttributes failed: {}", e)))?;
    let attributes = attributes
        .ok_or_else(|| CaptureError::Unknown("MFCreateAttributes returned no store".into()))?;
    attributes
        .SetUINT32(&MF_SOURCE_READER_ENABLE_VIDEO_PROCESSING, 1)
        .map_err(|e| CaptureError::Unknown(format!("SetUINT32 failed: {}", e)))?;

    let reader = MFCreateSourceReaderFromMediaSource(&source, &attributes).map_err(|e| {
        let _ = source.Shutdown();
        convert::capture_error(e.code().0)
    })?;

    let media_type = MFCreateMediaType()
        .map_err(|e| CaptureError::Unknown(format!("MFCreateMediaType failed: {}", e)))?;
    media_type
        .SetGUID(&MF_MT_MAJOR_TYPE, &MFMediaType_Video)
        .and_then(|_| media_type.SetGUID(&MF_MT_SUBTYPE, &MFVideoFormat_RGB32))
        .map_err(|e| CaptureError::Unknown(format!("SetGUID failed: {}", e)))?;
    reader
        .SetCurrentMediaType(FIRST_VIDEO_STREAM, None, &media_type)
        .map_err(|e| CaptureError::ConfigurationFailed(format!("camera cannot produce RGB32: {}", e)))?;

    Ok(reader)
}

unsafe fn current_geometry(reader: &IMFSourceReader) -> Result<FrameGeometry, CaptureError> {
    let media_type = reader
        .GetCurrentMediaType(FIRST_VIDEO_STREAM)
        .map_err(|e| CaptureError::Unknown(format!("GetCurrentMediaType failed: {}", e)))?;
    let frame_size = media_type
        .GetUINT64(&MF_MT_FRAME_SIZE)
        .map_err(|e| CaptureError::Unknown(format!("MF_MT_FRAME_SIZE missing: {}", e)))?;
    let width = (frame_size >> 32) as u32;
    let height = frame_size as u32;
    let stride = media_type
        .GetUINT32(&MF_MT_DEFAULT_STRIDE)
        .map(|s| s as i32)
        .unwrap_or((width * 4) as i32);
    Ok(FrameGeometry {
        width,
        height,
        stride,
    })
}

/// Read one sample. `Ok(None)` for stream ticks and empty reads.
unsafe fn read_frame(
    reader: &IMFSourceReader,
    geometry: &mut FrameGeometry,
    sequence: u64,
) -> Result<Option<VideoFrame>, CaptureError> {
    let mut flags: u32 = 0;
    let mut sample: Option<IMFSample> = None;
    reader
        .ReadSample(
            FIRST_VIDEO_STREAM,
            0,
            None,
            Some(&mut flags as *mut u32),
            None,
            Some(&mut sample as *mut Option<IMFSample>),
        )
        .map_err(|e| convert::capture_error(e.code().0))?;

    if flags & MF_SOURCE_READERF_ENDOFSTREAM.0 as u32 != 0
        || flags & MF_SOURCE_READERF_ERROR.0 as u32 != 0
    {
        return Err(CaptureError::DeviceNotAvailable);
    }
    if flags & MF_SOURCE_READERF_CURRENTMEDIATYPECHANGED.0 as u32 != 0 {
        *geometry = current_geometry(reader)?;
    }
    let Some(sample) = sample else {
        return Ok(None);
    };

    let buffer = sample
        .ConvertToContiguousBuffer()
        .map_err(|e| CaptureError::Unknown(format!("ConvertToContiguousBuffer failed: {}", e)))?;
    let mut bytes: *mut u8 = std::ptr::null_mut();
    let mut len: u32 = 0;
    buffer
        .Lock(&mut bytes, None, Some(&mut len as *mut u32))
        .map_err(|e| CaptureError::Unknown(format!("IMFMediaBuffer::Lock failed: {}", e)))?;
    let data = if bytes.is_null() {
        None
    } else {
        convert::packed_bgra(
            std::slice::from_raw_parts(bytes, len as usize),
            geometry.width,
            geometry.height,
            geometry.stride,
        )
    };
    let _ = buffer.Unlock();

    match data {
        Some(data) => Ok(Some(VideoFrame::new(
            sequence,
            geometry.width,
            geometry.height,
            PixelFormat::Bgra8,
            data,
        ))),
        None => {
            log::warn!("Dropping short frame {} ({} bytes)", sequence, len);
            Ok(None)
        }
    }
}
