use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::models::config::{PreviewOptions, VideoGravity};
use crate::models::device::DevicePosition;
use crate::models::frame::VideoFrame;
use crate::session::controller::CaptureSessionController;
use crate::session::fanout::{FrameFanout, FrameObserver};
use crate::traits::capture_backend::CaptureBackend;
use crate::traits::frame_renderer::FrameRenderer;

use super::layout::{PreviewLayout, Size};

#[derive(Default)]
struct Presented {
    frames: u64,
    last_frame: Option<VideoFrame>,
    last_layout: Option<PreviewLayout>,
}

struct SurfaceInner {
    bounds: Size,
    options: PreviewOptions,
    renderer: Option<Arc<dyn FrameRenderer>>,
    presented: Mutex<Presented>,
    frame_presented: Condvar,
}

impl FrameObserver for SurfaceInner {
    fn on_frame(&self, frame: &VideoFrame, source: DevicePosition) {
        let layout = PreviewLayout::compute(
            Size::new(frame.width, frame.height),
            self.bounds,
            self.options.gravity,
            self.options.effective_mirroring(source),
        );

        if let Some(ref renderer) = self.renderer {
            renderer.render(frame, &layout);
        }

        let mut presented = self.presented.lock();
        presented.frames += 1;
        presented.last_frame = Some(frame.clone());
        presented.last_layout = Some(layout);
        drop(presented);
        self.frame_presented.notify_all();
    }
}

/// Render target that mirrors a capture session's live frames.
///
/// The surface only observes the session: it holds the session output
/// weakly and the output holds the surface weakly. Dropping either side
/// ends the relationship.
pub struct PreviewSurface {
    inner: Arc<SurfaceInner>,
    output: Mutex<Weak<FrameFanout>>,
}

impl PreviewSurface {
    /// A surface that records frames without drawing them.
    pub fn new(bounds: Size, options: PreviewOptions) -> Self {
        Self::build(bounds, options, None)
    }

    pub fn with_renderer(bounds: Size, options: PreviewOptions, renderer: Arc<dyn FrameRenderer>) -> Self {
        Self::build(bounds, options, Some(renderer))
    }

    fn build(bounds: Size, options: PreviewOptions, renderer: Option<Arc<dyn FrameRenderer>>) -> Self {
        Self {
            inner: Arc::new(SurfaceInner {
                bounds,
                options,
                renderer,
                presented: Mutex::new(Presented::default()),
                frame_presented: Condvar::new(),
            }),
            output: Mutex::new(Weak::new()),
        }
    }

    /// Start receiving frames from `controller`'s session.
    ///
    /// Can happen before or after delivery starts.
    pub fn attach<B: CaptureBackend>(&self, controller: &CaptureSessionController<B>) {
        self.attach_output(controller.frame_output());
    }

    /// Attaching again to the same output does nothing.
    pub fn attach_output(&self, output: &Arc<FrameFanout>) {
        let mut current = self.output.lock();
        if current.upgrade().is_some_and(|o| Arc::ptr_eq(&o, output)) {
            return;
        }
        let observer: Arc<dyn FrameObserver> = self.inner.clone();
        output.attach(Arc::downgrade(&observer));
        *current = Arc::downgrade(output);
    }

    /// Whether the session output this surface attached to still exists.
    pub fn is_attached(&self) -> bool {
        self.output.lock().strong_count() > 0
    }

    pub fn bounds(&self) -> Size {
        self.inner.bounds
    }

    pub fn gravity(&self) -> VideoGravity {
        self.inner.options.gravity
    }

    pub fn is_mirrored(&self) -> bool {
        self.inner.options.mirrored
    }

    pub fn automatically_adjusts_mirroring(&self) -> bool {
        self.inner.options.automatically_adjusts_mirroring
    }

    pub fn frames_presented(&self) -> u64 {
        self.inner.presented.lock().frames
    }

    pub fn last_frame(&self) -> Option<VideoFrame> {
        self.inner.presented.lock().last_frame.clone()
    }

    pub fn last_layout(&self) -> Option<PreviewLayout> {
        self.inner.presented.lock().last_layout
    }

    /// Block until at least `count` frames have been presented.
    ///
    /// Returns `false` if `timeout` elapses first.
    pub fn wait_for_frames(&self, count: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut presented = self.inner.presented.lock();
        while presented.frames < count {
            if self
                .inner
                .frame_presented
                .wait_until(&mut presented, deadline)
                .timed_out()
            {
                return presented.frames >= count;
            }
        }
        true
    }
}
