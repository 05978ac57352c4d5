use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::models::device::DevicePosition;
use crate::models::frame::VideoFrame;
use crate::traits::capture_backend::FrameCallback;

/// Receives every frame pushed through a [`FrameFanout`].
pub trait FrameObserver: Send + Sync {
    /// `source` is the facing of the device that produced the frame.
    fn on_frame(&self, frame: &VideoFrame, source: DevicePosition);
}

/// The session's fixed output sink.
///
/// Holds observers weakly: a preview surface that goes away simply stops
/// receiving frames and is pruned on the next delivery. There is no
/// backpressure; each observer either keeps up or drops.
pub struct FrameFanout {
    observers: Mutex<Vec<Weak<dyn FrameObserver>>>,
    source: Mutex<DevicePosition>,
    frames_delivered: AtomicU64,
    observers_detached: AtomicU64,
}

impl FrameFanout {
    pub fn new() -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
            source: Mutex::new(DevicePosition::Unspecified),
            frames_delivered: AtomicU64::new(0),
            observers_detached: AtomicU64::new(0),
        }
    }

    pub fn attach(&self, observer: Weak<dyn FrameObserver>) {
        self.observers.lock().push(observer);
    }

    /// Number of observers still alive.
    pub fn observer_count(&self) -> usize {
        self.observers
            .lock()
            .iter()
            .filter(|o| o.strong_count() > 0)
            .count()
    }

    pub fn frames_delivered(&self) -> u64 {
        self.frames_delivered.load(Ordering::SeqCst)
    }

    pub fn observers_detached(&self) -> u64 {
        self.observers_detached.load(Ordering::Relaxed)
    }

    pub(crate) fn set_source(&self, position: DevicePosition) {
        *self.source.lock() = position;
    }

    /// Push one frame to every live observer.
    pub fn deliver(&self, frame: &VideoFrame) {
        let live: Vec<Arc<dyn FrameObserver>> = {
            let mut observers = self.observers.lock();
            let before = observers.len();
            observers.retain(|o| o.strong_count() > 0);
            let detached = before - observers.len();
            if detached > 0 {
                self.observers_detached
                    .fetch_add(detached as u64, Ordering::Relaxed);
            }
            observers.iter().filter_map(Weak::upgrade).collect()
        };
        let source = *self.source.lock();
        // counted first so no observer has seen a frame the counter has not
        self.frames_delivered.fetch_add(1, Ordering::SeqCst);

        // observers render outside the lock so attach() never waits on a frame
        for observer in live {
            observer.on_frame(frame, source);
        }
    }

    /// Callback to register with the backend.
    ///
    /// Holds the fan-out weakly so a delivery thread that outlives the
    /// controller does not keep it alive.
    pub fn sink(self: &Arc<Self>) -> FrameCallback {
        let fanout = Arc::downgrade(self);
        Arc::new(move |frame: &VideoFrame| {
            if let Some(fanout) = fanout.upgrade() {
                fanout.deliver(frame);
            }
        })
    }
}

impl Default for FrameFanout {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::frame::PixelFormat;

    #[derive(Default)]
    struct CountingObserver {
        frames: Mutex<Vec<(u64, DevicePosition)>>,
    }

    impl FrameObserver for CountingObserver {
        fn on_frame(&self, frame: &VideoFrame, source: DevicePosition) {
            self.frames.lock().push((frame.sequence, source));
        }
    }

    fn frame(sequence: u64) -> VideoFrame {
        VideoFrame::new(sequence, 2, 2, PixelFormat::Bgra8, vec![0u8; 16].into())
    }

    #[test]
    fn delivers_to_every_live_observer() {
        let fanout = Arc::new(FrameFanout::new());
        let a = Arc::new(CountingObserver::default());
        let b = Arc::new(CountingObserver::default());
        fanout.attach(Arc::downgrade(&a) as Weak<dyn FrameObserver>);
        fanout.attach(Arc::downgrade(&b) as Weak<dyn FrameObserver>);
        fanout.set_source(DevicePosition::Back);

        let sink = fanout.sink();
        sink(&frame(0));
        sink(&frame(1));

        assert_eq!(*a.frames.lock(), vec![(0, DevicePosition::Back), (1, DevicePosition::Back)]);
        assert_eq!(b.frames.lock().len(), 2);
        assert_eq!(fanout.frames_delivered(), 2);
    }

    #[test]
    fn dropped_observers_are_pruned() {
        let fanout = Arc::new(FrameFanout::new());
        let kept = Arc::new(CountingObserver::default());
        let dropped = Arc::new(CountingObserver::default());
        fanout.attach(Arc::downgrade(&kept) as Weak<dyn FrameObserver>);
        fanout.attach(Arc::downgrade(&dropped) as Weak<dyn FrameObserver>);
        drop(dropped);

        fanout.deliver(&frame(0));

        assert_eq!(fanout.observer_count(), 1);
        assert_eq!(fanout.observers_detached(), 1);
        assert_eq!(kept.frames.lock().len(), 1);
    }

    /// Reads the fan-out's counter from inside the delivery callback.
    struct CounterReader {
        fanout: Arc<FrameFanout>,
        seen: Mutex<Vec<u64>>,
    }

    impl FrameObserver for CounterReader {
        fn on_frame(&self, _frame: &VideoFrame, _source: DevicePosition) {
            self.seen.lock().push(self.fanout.frames_delivered());
        }
    }

    #[test]
    fn counter_is_never_behind_observers() {
        let fanout = Arc::new(FrameFanout::new());
        let reader = Arc::new(CounterReader {
            fanout: Arc::clone(&fanout),
            seen: Mutex::new(Vec::new()),
        });
        fanout.attach(Arc::downgrade(&reader) as Weak<dyn FrameObserver>);

        fanout.deliver(&frame(0));
        fanout.deliver(&frame(1));

        assert_eq!(*reader.seen.lock(), vec![1, 2]);
    }

    #[test]
    fn sink_outliving_fanout_is_inert() {
        let fanout = Arc::new(FrameFanout::new());
        let sink = fanout.sink();
        drop(fanout);
        sink(&frame(0));
    }
}
