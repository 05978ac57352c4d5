//! Capture thread bookkeeping.
//!
//! Each stream gets its own run flag, so a thread that was abandoned while
//! blocked in a read can never observe, or clear, the flag of the stream
//! that replaced it.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// One capture thread and the flag that keeps it reading.
pub struct CaptureWorker {
    running: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

impl CaptureWorker {
    /// Spawn `body` with a fresh flag set to running. The flag is cleared
    /// when `body` returns.
    pub fn spawn<F>(name: &str, body: F) -> io::Result<Self>
    where
        F: FnOnce(&AtomicBool) + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = thread::Builder::new().name(name.into()).spawn(move || {
            body(&flag);
            flag.store(false, Ordering::SeqCst);
        })?;
        Ok(Self { running, handle })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the thread to stop after its current read. Does not wait.
    pub fn signal_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Signal and wait for the thread to exit.
    pub fn stop(self) {
        self.signal_stop();
        if self.handle.join().is_err() {
            log::error!("Capture thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    /// A worker stuck in a "read" until `release` fires.
    fn blocked_worker() -> (CaptureWorker, mpsc::Sender<()>, mpsc::Receiver<bool>) {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (seen_tx, seen_rx) = mpsc::channel();
        let worker = CaptureWorker::spawn("test-capture", move |running| {
            while running.load(Ordering::SeqCst) {
                let _ = release_rx.recv_timeout(Duration::from_secs(5));
                let _ = seen_tx.send(running.load(Ordering::SeqCst));
            }
        })
        .unwrap();
        (worker, release_tx, seen_rx)
    }

    #[test]
    fn abandoned_worker_does_not_see_the_next_stream() {
        let (first, release_first, first_seen) = blocked_worker();
        // first frame never arrived: flag cleared while the read is pending
        first.signal_stop();

        let (second, release_second, second_seen) = blocked_worker();
        assert!(second.is_running());

        release_first.send(()).unwrap();
        assert_eq!(first_seen.recv_timeout(Duration::from_secs(2)), Ok(false));
        first.stop();

        assert!(second.is_running());
        release_second.send(()).unwrap();
        assert_eq!(second_seen.recv_timeout(Duration::from_secs(2)), Ok(true));
        drop(release_second);
        second.stop();
    }

    #[test]
    fn flag_clears_when_body_returns() {
        let worker = CaptureWorker::spawn("test-capture", |_| {}).unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while worker.is_running() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(!worker.is_running());
        worker.stop();
    }
}
