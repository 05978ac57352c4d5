use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::device::{CaptureDevice, SelectionIndex};
use crate::models::error::CaptureError;
use crate::models::state::{SessionDiagnostics, SessionSnapshot, SessionState};
use crate::registry::device_registry::DeviceRegistry;
use crate::session::fanout::FrameFanout;
use crate::traits::capture_backend::{CaptureBackend, FailureCallback};
use crate::traits::session_delegate::SessionDelegate;

/// Internal mutable controller state, protected by `parking_lot::Mutex`.
struct ControllerState {
    state: SessionState,
    session_id: Option<Uuid>,
    device: Option<CaptureDevice>,
    input_bound: bool,
    output_bound: bool,
    delivery_started_at: Option<DateTime<Utc>>,
    last_error: Option<CaptureError>,
    /// Failure reported while `start()` was still waiting on the backend.
    early_failure: Option<CaptureError>,
    configuration_attempts: u64,
    configuration_failures: u64,
}

impl ControllerState {
    fn new() -> Self {
        Self {
            state: SessionState::Idle,
            session_id: None,
            device: None,
            input_bound: false,
            output_bound: false,
            delivery_started_at: None,
            last_error: None,
            early_failure: None,
            configuration_attempts: 0,
            configuration_failures: 0,
        }
    }
}

/// Read-only view of a controller, cheap to clone and share with a UI.
#[derive(Clone)]
pub struct SessionMonitor {
    shared: Arc<Mutex<ControllerState>>,
    fanout: Arc<FrameFanout>,
}

impl SessionMonitor {
    pub fn state(&self) -> SessionState {
        self.shared.lock().state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let s = self.shared.lock();
        SessionSnapshot {
            session_id: s.session_id.map(|id| id.to_string()),
            state: s.state,
            device: s.device.clone(),
            bound_inputs: usize::from(s.input_bound),
            bound_outputs: usize::from(s.output_bound),
            delivery_started_at: s.delivery_started_at.map(|t| t.to_rfc3339()),
            last_error: s.last_error.as_ref().map(|e| e.to_string()),
            diagnostics: SessionDiagnostics {
                configuration_attempts: s.configuration_attempts,
                configuration_failures: s.configuration_failures,
                frames_delivered: self.fanout.frames_delivered(),
                surfaces_detached: self.fanout.observers_detached(),
            },
        }
    }
}

/// Owns the one capture session and drives it through its lifecycle.
///
/// ```text
/// set_up(selection):  begin → probe → open → add input → add output → commit
/// start():            start_running, frames flow into the fan-out
/// stop() / drop:      stop_running → remove output → remove input → commit
/// ```
///
/// Hardware failures come back as `Err` with the session rolled back to
/// idle. A selection that does not index the registry's current list is a
/// caller bug and panics before the backend is touched.
///
/// A stream that dies after `start()` (device unplugged, driver error)
/// drops back to running { delivering: false } and is reported through the
/// delegate; call `start()` to retry or `stop()` to release the device.
pub struct CaptureSessionController<B: CaptureBackend> {
    registry: Arc<DeviceRegistry>,
    backend: B,
    fanout: Arc<FrameFanout>,
    shared: Arc<Mutex<ControllerState>>,
    delegate: Option<Arc<dyn SessionDelegate>>,
}

impl<B: CaptureBackend> CaptureSessionController<B> {
    pub fn new(registry: Arc<DeviceRegistry>, backend: B) -> Self {
        Self {
            registry,
            backend,
            fanout: Arc::new(FrameFanout::new()),
            shared: Arc::new(Mutex::new(ControllerState::new())),
            delegate: None,
        }
    }

    /// Mid-stream failures are reported to the delegate set before `set_up`.
    pub fn set_delegate(&mut self, delegate: Arc<dyn SessionDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().state
    }

    pub fn monitor(&self) -> SessionMonitor {
        SessionMonitor {
            shared: Arc::clone(&self.shared),
            fanout: Arc::clone(&self.fanout),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.monitor().snapshot()
    }

    /// The session output preview surfaces attach to.
    pub fn frame_output(&self) -> &Arc<FrameFanout> {
        &self.fanout
    }

    /// Bind the selected device and the frame output in one configuration
    /// transaction. Transitions: idle → configuring → running.
    ///
    /// # Panics
    ///
    /// If `selection` came from a list other than the registry's most recent
    /// one, or its index is out of range for that list.
    pub fn set_up(&mut self, selection: SelectionIndex) -> Result<(), CaptureError> {
        let device_id = self.resolve_selection(selection);

        let state = self.state();
        if !state.is_idle() {
            return Err(CaptureError::InvalidState(format!(
                "can only set up from idle state, currently {}",
                state
            )));
        }

        self.shared.lock().configuration_attempts += 1;
        self.set_state(SessionState::Configuring);
        self.backend.begin_configuration();

        match self.configure(&device_id) {
            Ok(device) => {
                log::info!("Capture session configured with {} ({})", device.name, device.id);
                self.fanout.set_source(device.position);
                {
                    let mut s = self.shared.lock();
                    s.session_id = Some(Uuid::new_v4());
                    s.device = Some(device);
                    s.last_error = None;
                }
                self.set_state(SessionState::Running { delivering: false });
                Ok(())
            }
            Err(e) => {
                self.roll_back();
                self.shared.lock().configuration_failures += 1;
                self.report(&e);
                self.set_state(SessionState::Idle);
                Err(e)
            }
        }
    }

    /// Start continuous frame delivery.
    /// Transitions: running { delivering: false } → running { delivering: true }.
    ///
    /// A second call while frames are already flowing does nothing.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        match self.state() {
            SessionState::Running { delivering: true } => {
                log::debug!("Frame delivery already started");
                return Ok(());
            }
            SessionState::Running { delivering: false } => {}
            other => {
                return Err(CaptureError::InvalidState(format!(
                    "cannot start delivery while {}",
                    other
                )))
            }
        }

        self.shared.lock().early_failure = None;
        if let Err(e) = self.backend.start_running() {
            self.report(&e);
            return Err(e);
        }

        let started = {
            let mut s = self.shared.lock();
            match s.early_failure.take() {
                Some(e) => Err(e),
                None => {
                    s.state = SessionState::Running { delivering: true };
                    s.delivery_started_at = Some(Utc::now());
                    Ok(s.device.clone())
                }
            }
        };

        match started {
            Ok(device) => {
                if let Some(ref delegate) = self.delegate {
                    delegate.on_state_changed(&SessionState::Running { delivering: true });
                    if let Some(device) = device {
                        delegate.on_delivery_started(&device);
                    }
                }
                Ok(())
            }
            Err(e) => {
                // the stream died before we saw it start; reap its thread
                self.backend.stop_running();
                self.report(&e);
                Err(e)
            }
        }
    }

    /// Stop delivery and release the device. Transitions: running → idle.
    ///
    /// Safe to call in any state; an idle controller is left untouched.
    pub fn stop(&mut self) {
        if self.state().is_idle() {
            return;
        }
        self.release();
        log::info!("Capture session stopped");
    }

    /// Same as [`stop`](Self::stop).
    pub fn teardown(&mut self) {
        self.stop();
    }

    // --- Internal helpers ---

    /// Map `selection` to the device id it pointed at when the list was made.
    fn resolve_selection(&self, selection: SelectionIndex) -> String {
        let latest = self.registry.latest();
        assert_eq!(
            selection.generation(),
            latest.generation,
            "device selection is stale: made from enumeration {} but the current list is enumeration {}",
            selection.generation(),
            latest.generation
        );
        assert!(
            selection.index() < latest.device_ids.len(),
            "device selection index {} out of range for {} device(s)",
            selection.index(),
            latest.device_ids.len()
        );
        latest.device_ids[selection.index()].clone()
    }

    /// Steps between begin and commit. Anything bound before a failure is
    /// left for `roll_back` to remove.
    fn configure(&mut self, device_id: &str) -> Result<CaptureDevice, CaptureError> {
        // the list may have changed since the user picked from it
        let device = self
            .registry
            .probe()
            .into_iter()
            .find(|d| d.id == device_id)
            .ok_or_else(|| CaptureError::DeviceDisconnected {
                id: device_id.to_string(),
            })?;

        let input = self.backend.open_input(&device)?;
        if !self.backend.can_add_input(&input) {
            return Err(CaptureError::ConfigurationFailed(format!(
                "session rejected input {}",
                device.name
            )));
        }
        self.backend.add_input(input);
        self.shared.lock().input_bound = true;

        if !self.backend.can_add_output() {
            return Err(CaptureError::ConfigurationFailed(
                "session rejected frame output".into(),
            ));
        }
        self.backend.add_output(self.fanout.sink(), self.failure_handler());
        self.shared.lock().output_bound = true;

        self.backend.commit_configuration()?;
        Ok(device)
    }

    /// Undo a failed transaction and commit the empty configuration.
    fn roll_back(&mut self) {
        let (input_bound, output_bound) = {
            let s = self.shared.lock();
            (s.input_bound, s.output_bound)
        };
        if output_bound {
            self.backend.remove_output();
        }
        if input_bound {
            self.backend.remove_input();
        }
        if let Err(e) = self.backend.commit_configuration() {
            log::warn!("Failed to commit rolled back configuration: {}", e);
        }

        let mut s = self.shared.lock();
        s.input_bound = false;
        s.output_bound = false;
    }

    /// Reports a stream that stopped on its own.
    ///
    /// Runs on the backend's delivery thread, so it only touches shared
    /// state and the delegate captured at configuration time.
    fn failure_handler(&self) -> FailureCallback {
        let shared: Weak<Mutex<ControllerState>> = Arc::downgrade(&self.shared);
        let delegate = self.delegate.clone();
        Arc::new(move |error: &CaptureError| {
            let Some(shared) = shared.upgrade() else {
                return;
            };
            let mut s = shared.lock();
            match s.state {
                SessionState::Running { delivering: true } => {
                    s.state = SessionState::Running { delivering: false };
                    s.delivery_started_at = None;
                    s.last_error = Some(error.clone());
                    drop(s);

                    log::error!("Frame delivery stopped: {}", error);
                    if let Some(ref delegate) = delegate {
                        delegate.on_error(error);
                        delegate.on_state_changed(&SessionState::Running { delivering: false });
                    }
                }
                // start() is still waiting on the backend and reports it
                SessionState::Running { delivering: false } => {
                    s.early_failure = Some(error.clone());
                }
                _ => {}
            }
        })
    }

    fn release(&mut self) {
        // also reaps a delivery thread that ended after a stream failure
        if self.state().is_running() {
            self.backend.stop_running();
        }

        self.backend.begin_configuration();
        self.roll_back();

        {
            let mut s = self.shared.lock();
            s.session_id = None;
            s.device = None;
            s.delivery_started_at = None;
        }
        self.set_state(SessionState::Idle);
    }

    fn report(&self, error: &CaptureError) {
        log::error!("Capture session error: {}", error);
        self.shared.lock().last_error = Some(error.clone());
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(error);
        }
    }

    fn set_state(&self, new_state: SessionState) {
        self.shared.lock().state = new_state;
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(&new_state);
        }
    }
}

impl<B: CaptureBackend> Drop for CaptureSessionController<B> {
    fn drop(&mut self) {
        if !self.state().is_idle() {
            self.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::time::Duration;

    use super::*;
    use crate::models::config::{DiscoveryFilter, PreviewOptions, VideoGravity};
    use crate::models::device::{DeviceClass, DevicePosition, MediaKind};
    use crate::preview::layout::Size;
    use crate::preview::surface::PreviewSurface;
    use crate::virtual_camera::{RigEvent, VirtualBackend, VirtualCameraRig, VirtualFault};

    const FRAME_TIMEOUT: Duration = Duration::from_secs(2);

    fn device(id: &str, class: DeviceClass) -> CaptureDevice {
        CaptureDevice {
            id: id.into(),
            name: format!("Camera {}", id.to_uppercase()),
            device_class: class,
            position: DevicePosition::Front,
            media_kind: MediaKind::Video,
        }
    }

    /// Rig with A (built-in) and B (external) attached.
    fn rig() -> VirtualCameraRig {
        let rig = VirtualCameraRig::new();
        rig.plug(device("a", DeviceClass::BuiltInWideAngle));
        rig.plug(device("b", DeviceClass::ExternalUnknown));
        rig
    }

    fn controller(rig: &VirtualCameraRig) -> CaptureSessionController<VirtualBackend> {
        let registry = Arc::new(DeviceRegistry::new(Arc::new(rig.clone()), DiscoveryFilter::DEFAULT));
        let backend = rig.backend().with_frame_interval(Duration::from_millis(5));
        CaptureSessionController::new(registry, backend)
    }

    #[derive(Default)]
    struct SpyDelegate {
        states: Mutex<Vec<SessionState>>,
        errors: Mutex<Vec<CaptureError>>,
        started: Mutex<Vec<String>>,
    }

    impl SessionDelegate for SpyDelegate {
        fn on_state_changed(&self, state: &SessionState) {
            self.states.lock().push(*state);
        }

        fn on_error(&self, error: &CaptureError) {
            self.errors.lock().push(error.clone());
        }

        fn on_delivery_started(&self, device: &CaptureDevice) {
            self.started.lock().push(device.id.clone());
        }
    }

    #[test]
    fn selecting_external_camera_binds_it_and_previews_mirrored() {
        let rig = rig();
        let mut controller = controller(&rig);
        let surface = PreviewSurface::new(Size::new(1920, 1080), PreviewOptions::default());
        surface.attach(&controller);

        let devices = controller.registry().enumerate();
        controller.set_up(devices.select(1)).unwrap();

        assert_eq!(controller.state(), SessionState::Running { delivering: false });
        assert_eq!(rig.bound_input().as_deref(), Some("b"));

        controller.start().unwrap();
        assert!(surface.wait_for_frames(1, FRAME_TIMEOUT));

        assert_eq!(controller.state(), SessionState::Running { delivering: true });
        assert_eq!(rig.bound_inputs(), 1);
        assert_eq!(rig.bound_outputs(), 1);
        assert!(surface.is_mirrored());
        assert!(!surface.automatically_adjusts_mirroring());
        assert_eq!(surface.gravity(), VideoGravity::AspectFill);
        let layout = surface.last_layout().unwrap();
        assert!(layout.mirrored);
        assert_eq!(layout.gravity, VideoGravity::AspectFill);

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.device.map(|d| d.id), Some("b".to_string()));
        assert_eq!(snapshot.bound_inputs, 1);
        assert_eq!(snapshot.bound_outputs, 1);
        assert!(snapshot.session_id.is_some());
        assert!(snapshot.delivery_started_at.is_some());
        assert!(snapshot.diagnostics.frames_delivered >= 1);
    }

    #[test]
    fn every_index_in_range_reaches_running() {
        let rig = rig();
        for index in 0..2 {
            let mut controller = controller(&rig);
            let devices = controller.registry().enumerate();
            controller.set_up(devices.select(index)).unwrap();
            assert!(controller.state().is_running());
            assert_eq!(rig.bound_input(), devices.get(index).map(|d| d.id.clone()));
        }
        // each controller released its session on drop
        assert_eq!(rig.bound_inputs(), 0);
    }

    #[test]
    fn injected_failures_roll_back_to_idle() {
        let cases = [
            (VirtualFault::Busy, CaptureError::DeviceBusy),
            (VirtualFault::PermissionDenied, CaptureError::PermissionDenied),
            (VirtualFault::Unavailable, CaptureError::DeviceNotAvailable),
            (
                VirtualFault::RejectInput,
                CaptureError::ConfigurationFailed("session rejected input Camera A".into()),
            ),
            (
                VirtualFault::RejectOutput,
                CaptureError::ConfigurationFailed("session rejected frame output".into()),
            ),
            (
                VirtualFault::CommitFails,
                CaptureError::ConfigurationFailed("virtual device refused configuration".into()),
            ),
        ];

        for (fault, expected) in cases {
            let rig = rig();
            rig.set_fault("a", Some(fault));
            let mut controller = controller(&rig);
            let devices = controller.registry().enumerate();

            let result = controller.set_up(devices.select(0));

            assert_eq!(result, Err(expected.clone()), "fault {:?}", fault);
            assert_eq!(controller.state(), SessionState::Idle, "fault {:?}", fault);
            assert_eq!(rig.bound_inputs(), 0, "fault {:?}", fault);
            assert_eq!(rig.bound_outputs(), 0, "fault {:?}", fault);

            let snapshot = controller.snapshot();
            assert_eq!(snapshot.last_error, Some(expected.to_string()));
            assert_eq!(snapshot.bound_inputs, 0);
            assert_eq!(snapshot.bound_outputs, 0);
            assert_eq!(snapshot.diagnostics.configuration_failures, 1);
        }
    }

    #[test]
    fn failed_transaction_commits_the_rollback() {
        let rig = rig();
        rig.set_fault("a", Some(VirtualFault::RejectOutput));
        let mut controller = controller(&rig);
        let devices = controller.registry().enumerate();
        rig.clear_events();

        let _ = controller.set_up(devices.select(0));

        assert_eq!(
            rig.events(),
            vec![
                RigEvent::BeginConfiguration,
                RigEvent::Discover,
                RigEvent::OpenInput("a".into()),
                RigEvent::AddInput("a".into()),
                RigEvent::RemoveInput("a".into()),
                RigEvent::CommitConfiguration,
            ]
        );
    }

    #[test]
    fn can_retry_after_recoverable_error() {
        let rig = rig();
        rig.set_fault("a", Some(VirtualFault::Busy));
        let mut controller = controller(&rig);
        let devices = controller.registry().enumerate();

        assert_eq!(controller.set_up(devices.select(0)), Err(CaptureError::DeviceBusy));

        rig.set_fault("a", None);
        controller.set_up(devices.select(0)).unwrap();
        assert!(controller.state().is_running());
        assert_eq!(controller.snapshot().last_error, None);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_index_panics() {
        let rig = rig();
        let mut controller = controller(&rig);
        let devices = controller.registry().enumerate();
        let _ = controller.set_up(devices.select(2));
    }

    #[test]
    fn out_of_range_index_fails_before_any_backend_call() {
        let rig = rig();
        let mut controller = controller(&rig);
        let devices = controller.registry().enumerate();
        rig.clear_events();

        let outcome = catch_unwind(AssertUnwindSafe(|| controller.set_up(devices.select(7))));

        assert!(outcome.is_err());
        assert!(rig.events().is_empty());
        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(controller.snapshot().diagnostics.configuration_attempts, 0);
    }

    #[test]
    #[should_panic(expected = "stale")]
    fn selection_from_replaced_list_panics() {
        let rig = rig();
        let mut controller = controller(&rig);
        let old = controller.registry().enumerate();
        let _current = controller.registry().enumerate();
        let _ = controller.set_up(old.select(0));
    }

    #[test]
    fn unplugged_device_is_a_recoverable_error() {
        let rig = rig();
        let mut controller = controller(&rig);
        let devices = controller.registry().enumerate();
        rig.unplug("b");

        let result = controller.set_up(devices.select(1));

        assert_eq!(result, Err(CaptureError::DeviceDisconnected { id: "b".into() }));
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(!rig
            .events()
            .iter()
            .any(|e| matches!(e, RigEvent::OpenInput(_) | RigEvent::AddInput(_))));
    }

    #[test]
    fn device_is_resolved_by_identity_not_position() {
        let rig = rig();
        let mut controller = controller(&rig);
        let devices = controller.registry().enumerate();
        // "b" moves from index 1 to index 0 in the fresh list
        rig.unplug("a");

        controller.set_up(devices.select(1)).unwrap();
        assert_eq!(rig.bound_input().as_deref(), Some("b"));
    }

    #[test]
    fn start_requires_committed_configuration() {
        let rig = rig();
        let mut controller = controller(&rig);
        assert!(matches!(controller.start(), Err(CaptureError::InvalidState(_))));
        assert!(!rig.is_delivering());
    }

    #[test]
    fn second_start_is_a_no_op() {
        let rig = rig();
        let mut controller = controller(&rig);
        let devices = controller.registry().enumerate();
        controller.set_up(devices.select(0)).unwrap();

        controller.start().unwrap();
        controller.start().unwrap();

        let starts = rig
            .events()
            .iter()
            .filter(|e| **e == RigEvent::StartRunning)
            .count();
        assert_eq!(starts, 1);
    }

    #[test]
    fn set_up_while_running_is_rejected() {
        let rig = rig();
        let mut controller = controller(&rig);
        let devices = controller.registry().enumerate();
        controller.set_up(devices.select(0)).unwrap();

        let result = controller.set_up(devices.select(1));
        assert!(matches!(result, Err(CaptureError::InvalidState(_))));
        assert_eq!(rig.bound_input().as_deref(), Some("a"));
    }

    #[test]
    fn start_failure_keeps_committed_session() {
        let rig = rig();
        rig.set_fault("a", Some(VirtualFault::StartFails));
        let mut controller = controller(&rig);
        let devices = controller.registry().enumerate();
        controller.set_up(devices.select(0)).unwrap();

        assert_eq!(controller.start(), Err(CaptureError::DeviceBusy));
        assert_eq!(controller.state(), SessionState::Running { delivering: false });

        controller.stop();
        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(rig.bound_inputs(), 0);
        assert_eq!(rig.bound_outputs(), 0);
    }

    /// Poll `condition` until it holds or `FRAME_TIMEOUT` passes.
    fn eventually(condition: impl Fn() -> bool) -> bool {
        let deadline = std::time::Instant::now() + FRAME_TIMEOUT;
        while std::time::Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        condition()
    }

    #[test]
    fn stream_failure_after_start_is_reported_and_recoverable() {
        let rig = rig();
        let delegate = Arc::new(SpyDelegate::default());
        let mut controller = controller(&rig);
        controller.set_delegate(delegate.clone());
        let surface = PreviewSurface::new(Size::new(640, 480), PreviewOptions::default());
        surface.attach(&controller);
        let devices = controller.registry().enumerate();
        controller.set_up(devices.select(0)).unwrap();
        controller.start().unwrap();
        assert!(surface.wait_for_frames(1, FRAME_TIMEOUT));

        rig.set_fault("a", Some(VirtualFault::StreamFails));

        // the state change is the handler's last delegate call
        assert!(eventually(|| {
            delegate.states.lock().last() == Some(&SessionState::Running { delivering: false })
        }));
        assert_eq!(controller.state(), SessionState::Running { delivering: false });
        assert!(!rig.is_delivering());
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.last_error, Some(CaptureError::DeviceBusy.to_string()));
        assert_eq!(snapshot.delivery_started_at, None);
        assert_eq!(*delegate.errors.lock(), vec![CaptureError::DeviceBusy]);

        // retry on the same committed session
        rig.set_fault("a", None);
        let seen = surface.frames_presented();
        controller.start().unwrap();
        assert!(surface.wait_for_frames(seen + 1, FRAME_TIMEOUT));
        assert!(controller.state().is_delivering());

        controller.stop();
        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(rig.bound_inputs(), 0);
        assert_eq!(rig.bound_outputs(), 0);
    }

    #[test]
    fn unplug_while_delivering_reports_disconnect() {
        let rig = rig();
        let mut controller = controller(&rig);
        let devices = controller.registry().enumerate();
        controller.set_up(devices.select(1)).unwrap();
        controller.start().unwrap();

        rig.unplug("b");

        assert!(eventually(|| !controller.state().is_delivering()));
        assert_eq!(
            controller.snapshot().last_error,
            Some(CaptureError::DeviceDisconnected { id: "b".into() }.to_string())
        );

        controller.teardown();
        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(rig.bound_inputs(), 0);
        assert!(!rig.is_delivering());
    }

    #[test]
    fn stop_releases_input_output_and_delivery() {
        let rig = rig();
        let mut controller = controller(&rig);
        let surface = PreviewSurface::new(Size::new(640, 480), PreviewOptions::default());
        surface.attach(&controller);
        let devices = controller.registry().enumerate();
        controller.set_up(devices.select(0)).unwrap();
        controller.start().unwrap();
        assert!(surface.wait_for_frames(1, FRAME_TIMEOUT));

        controller.stop();

        assert_eq!(controller.state(), SessionState::Idle);
        assert!(!rig.is_delivering());
        assert_eq!(rig.bound_inputs(), 0);
        assert_eq!(rig.bound_outputs(), 0);
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.session_id, None);
        assert_eq!(snapshot.device, None);

        // the session can be configured again afterwards
        let devices = controller.registry().enumerate();
        controller.set_up(devices.select(1)).unwrap();
        assert_eq!(rig.bound_input().as_deref(), Some("b"));
    }

    #[test]
    fn stop_on_idle_controller_does_nothing() {
        let rig = rig();
        let mut controller = controller(&rig);
        rig.clear_events();
        controller.stop();
        assert!(rig.events().is_empty());
    }

    #[test]
    fn dropping_controller_releases_hardware() {
        let rig = rig();
        let mut controller = controller(&rig);
        let devices = controller.registry().enumerate();
        controller.set_up(devices.select(0)).unwrap();
        controller.start().unwrap();
        assert!(rig.is_delivering());

        drop(controller);

        assert!(!rig.is_delivering());
        assert_eq!(rig.bound_inputs(), 0);
        assert_eq!(rig.bound_outputs(), 0);
    }

    #[test]
    fn delegate_sees_transitions_and_errors() {
        let rig = rig();
        let delegate = Arc::new(SpyDelegate::default());
        let mut controller = controller(&rig);
        controller.set_delegate(delegate.clone());
        let devices = controller.registry().enumerate();

        rig.set_fault("a", Some(VirtualFault::PermissionDenied));
        let _ = controller.set_up(devices.select(0));
        rig.set_fault("a", None);
        controller.set_up(devices.select(0)).unwrap();
        controller.start().unwrap();

        assert_eq!(
            *delegate.states.lock(),
            vec![
                SessionState::Configuring,
                SessionState::Idle,
                SessionState::Configuring,
                SessionState::Running { delivering: false },
                SessionState::Running { delivering: true },
            ]
        );
        assert_eq!(*delegate.errors.lock(), vec![CaptureError::PermissionDenied]);
        assert_eq!(*delegate.started.lock(), vec!["a".to_string()]);
    }

    #[test]
    fn no_devices_is_fatal_before_selection() {
        let rig = VirtualCameraRig::new();
        let controller = controller(&rig);
        let result = controller.registry().enumerate().require_devices();
        assert_eq!(result, Err(CaptureError::NoDevicesFound));
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[test]
    fn monitor_tracks_controller_from_another_thread() {
        let rig = rig();
        let mut controller = controller(&rig);
        let monitor = controller.monitor();
        let devices = controller.registry().enumerate();
        controller.set_up(devices.select(0)).unwrap();

        let state = std::thread::spawn(move || monitor.state()).join().unwrap();
        assert_eq!(state, SessionState::Running { delivering: false });

        let json = serde_json::to_value(controller.snapshot()).unwrap();
        assert_eq!(json["state"]["state"], "running");
        assert_eq!(json["device"]["id"], "a");
        assert_eq!(json["bound_inputs"], 1);
    }
}
