use super::controller::{CaptureError, CaptureSessionController, ControllerOutcome, SessionState};
use super::driver::{CameraDriver, CameraEvent, RawFrame};
use super::{IMAGE_HEIGHT, IMAGE_WIDTH};
use crossbeam_channel::{unbounded, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Scripted driver that records calls; tests inject callbacks directly via
/// `handle_event` instead of going through the event channel.
struct FakeDriver {
    ids: Vec<String>,
    fail_open: bool,
    opens: Arc<AtomicUsize>,
    submits: Arc<AtomicUsize>,
    session_closes: Arc<AtomicUsize>,
    device_closes: Arc<AtomicUsize>,
    last_request: Arc<AtomicUsize>,
}

#[derive(Clone)]
struct FakeCounters {
    opens: Arc<AtomicUsize>,
    submits: Arc<AtomicUsize>,
    session_closes: Arc<AtomicUsize>,
    device_closes: Arc<AtomicUsize>,
    last_request: Arc<AtomicUsize>,
}

impl FakeDriver {
    fn new(ids: &[&str]) -> (Self, FakeCounters) {
        let driver = Self {
            ids: ids.iter().map(|id| id.to_string()).collect(),
            fail_open: false,
            opens: Arc::new(AtomicUsize::new(0)),
            submits: Arc::new(AtomicUsize::new(0)),
            session_closes: Arc::new(AtomicUsize::new(0)),
            device_closes: Arc::new(AtomicUsize::new(0)),
            last_request: Arc::new(AtomicUsize::new(0)),
        };
        let counters = FakeCounters {
            opens: driver.opens.clone(),
            submits: driver.submits.clone(),
            session_closes: driver.session_closes.clone(),
            device_closes: driver.device_closes.clone(),
            last_request: driver.last_request.clone(),
        };
        (driver, counters)
    }
}

impl CameraDriver for FakeDriver {
    fn camera_ids(&self) -> Vec<String> {
        self.ids.clone()
    }

    fn open(
        &mut self,
        _camera_id: &str,
        _width: u32,
        _height: u32,
        _events: Sender<CameraEvent>,
    ) -> anyhow::Result<()> {
        if self.fail_open {
            anyhow::bail!("open refused");
        }
        self.opens.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn configure_session(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn submit_capture(&mut self, request_id: u64) -> anyhow::Result<()> {
        self.submits.fetch_add(1, Ordering::Relaxed);
        self.last_request.store(request_id as usize, Ordering::Relaxed);
        Ok(())
    }

    fn close_session(&mut self) {
        self.session_closes.fetch_add(1, Ordering::Relaxed);
    }

    fn close_device(&mut self) {
        self.device_closes.fetch_add(1, Ordering::Relaxed);
    }
}

fn controller_with(ids: &[&str]) -> (CaptureSessionController, FakeCounters) {
    let (driver, counters) = FakeDriver::new(ids);
    let controller = CaptureSessionController::new(Box::new(driver), IMAGE_WIDTH, IMAGE_HEIGHT);
    (controller, counters)
}

fn frame() -> RawFrame {
    RawFrame {
        width: IMAGE_WIDTH,
        height: IMAGE_HEIGHT,
        data: vec![0xFF, 0xD8, 0xFF],
    }
}

/// Drive a fresh controller to `SessionReady` with one pending capture.
fn controller_capturing() -> (CaptureSessionController, FakeCounters) {
    let (mut controller, counters) = controller_with(&["cam0"]);
    let (tx, _rx) = unbounded();
    controller.open(tx, None).expect("open should dispatch");
    controller.handle_event(CameraEvent::Opened);
    controller.capture().expect("capture should configure");
    controller.handle_event(CameraEvent::SessionConfigured);
    assert_eq!(controller.state(), SessionState::Capturing);
    (controller, counters)
}

#[test]
fn capture_before_open_fails_not_initialized() {
    let (mut controller, _) = controller_with(&["cam0"]);
    assert_eq!(controller.capture(), Err(CaptureError::NotInitialized));

    let (tx, _rx) = unbounded();
    controller.open(tx, None).expect("open should dispatch");
    // Still waiting on the Opened callback.
    assert_eq!(controller.capture(), Err(CaptureError::NotInitialized));
}

#[test]
fn open_with_no_cameras_is_fatal() {
    let (mut controller, _) = controller_with(&[]);
    let (tx, _rx) = unbounded();
    assert_eq!(controller.open(tx, None), Err(CaptureError::NoCameraFound));
    assert_eq!(controller.state(), SessionState::Error);
}

#[test]
fn open_honors_preferred_camera() {
    let (mut controller, _) = controller_with(&["cam0", "cam1"]);
    let (tx, _rx) = unbounded();
    controller
        .open(tx, Some("cam1"))
        .expect("preferred id should resolve");
    assert_eq!(controller.state(), SessionState::Opening);
}

#[test]
fn open_rejects_unknown_preferred_camera() {
    let (mut controller, _) = controller_with(&["cam0"]);
    let (tx, _rx) = unbounded();
    let result = controller.open(tx, Some("cam9"));
    assert!(matches!(result, Err(CaptureError::DeviceError(_))));
}

#[test]
fn full_capture_cycle_returns_to_open() {
    let (mut controller, counters) = controller_capturing();
    let request_id = counters.last_request.load(Ordering::Relaxed) as u64;
    assert_eq!(counters.submits.load(Ordering::Relaxed), 1);

    let outcome = controller.handle_event(CameraEvent::CaptureCompleted {
        request_id,
        frame: frame(),
    });
    assert!(matches!(outcome, ControllerOutcome::FrameReady(_)));
    // Session is closed per capture; device stays open for the next shot.
    assert_eq!(controller.state(), SessionState::Open);
    assert_eq!(counters.session_closes.load(Ordering::Relaxed), 1);
    assert_eq!(counters.device_closes.load(Ordering::Relaxed), 0);

    controller.capture().expect("next capture reconfigures");
    assert_eq!(controller.state(), SessionState::SessionConfiguring);
}

#[test]
fn mismatched_request_id_is_dropped() {
    let (mut controller, counters) = controller_capturing();
    let request_id = counters.last_request.load(Ordering::Relaxed) as u64;

    let outcome = controller.handle_event(CameraEvent::CaptureCompleted {
        request_id: request_id + 7,
        frame: frame(),
    });
    assert!(matches!(outcome, ControllerOutcome::None));
    assert_eq!(controller.state(), SessionState::Capturing);
}

#[test]
fn session_config_failure_returns_to_open_and_retries() {
    let (mut controller, _) = controller_with(&["cam0"]);
    let (tx, _rx) = unbounded();
    controller.open(tx, None).expect("open should dispatch");
    controller.handle_event(CameraEvent::Opened);
    controller.capture().expect("capture should configure");

    let outcome = controller.handle_event(CameraEvent::SessionConfigFailed);
    assert!(matches!(
        outcome,
        ControllerOutcome::Failed(CaptureError::SessionConfigFailed)
    ));
    assert_eq!(controller.state(), SessionState::Open);

    // A later capture() retries configuration from scratch.
    controller.capture().expect("retry should configure");
    assert_eq!(controller.state(), SessionState::SessionConfiguring);
}

#[test]
fn disconnect_while_capturing_releases_handle_once() {
    let (mut controller, counters) = controller_capturing();

    let outcome = controller.handle_event(CameraEvent::Disconnected);
    assert!(matches!(
        outcome,
        ControllerOutcome::Failed(CaptureError::DeviceError(_))
    ));
    assert_eq!(controller.state(), SessionState::Closing);
    assert_eq!(counters.device_closes.load(Ordering::Relaxed), 1);

    controller.handle_event(CameraEvent::Closed);
    assert_eq!(controller.state(), SessionState::Closed);

    // A shutdown racing the error path finds nothing left to release.
    controller.shutdown();
    assert_eq!(counters.device_closes.load(Ordering::Relaxed), 1);
}

#[test]
fn shutdown_twice_is_a_noop_the_second_time() {
    let (mut controller, counters) = controller_with(&["cam0"]);
    let (tx, _rx) = unbounded();
    controller.open(tx, None).expect("open should dispatch");
    controller.handle_event(CameraEvent::Opened);

    controller.shutdown();
    assert_eq!(controller.state(), SessionState::Closed);
    assert_eq!(counters.device_closes.load(Ordering::Relaxed), 1);

    controller.shutdown();
    assert_eq!(counters.device_closes.load(Ordering::Relaxed), 1);
}

#[test]
fn stray_callbacks_after_close_are_noops() {
    let (mut controller, counters) = controller_capturing();
    let request_id = counters.last_request.load(Ordering::Relaxed) as u64;
    controller.shutdown();

    assert!(matches!(
        controller.handle_event(CameraEvent::SessionConfigFailed),
        ControllerOutcome::None
    ));
    assert!(matches!(
        controller.handle_event(CameraEvent::CaptureCompleted {
            request_id,
            frame: frame(),
        }),
        ControllerOutcome::None
    ));
    assert!(matches!(
        controller.handle_event(CameraEvent::DeviceError("late".to_string())),
        ControllerOutcome::None
    ));
    assert_eq!(controller.state(), SessionState::Closed);
    assert_eq!(counters.device_closes.load(Ordering::Relaxed), 1);
}

#[test]
fn reopen_after_close_starts_fresh_lifecycle() {
    let (mut controller, counters) = controller_capturing();
    controller.handle_event(CameraEvent::Disconnected);
    controller.handle_event(CameraEvent::Closed);
    assert_eq!(controller.state(), SessionState::Closed);

    let (tx, _rx) = unbounded();
    controller.open(tx, None).expect("reopen should dispatch");
    assert_eq!(controller.state(), SessionState::Opening);
    assert_eq!(counters.opens.load(Ordering::Relaxed), 2);

    controller.handle_event(CameraEvent::Opened);
    controller.capture().expect("fresh lifecycle captures");
    controller.handle_event(CameraEvent::SessionConfigured);
    assert_eq!(controller.state(), SessionState::Capturing);

    controller.shutdown();
    assert_eq!(counters.device_closes.load(Ordering::Relaxed), 2);
}

#[test]
fn open_dispatch_failure_parks_in_error() {
    let (mut driver, _) = FakeDriver::new(&["cam0"]);
    driver.fail_open = true;
    let mut controller =
        CaptureSessionController::new(Box::new(driver), IMAGE_WIDTH, IMAGE_HEIGHT);
    let (tx, _rx) = unbounded();
    assert!(matches!(
        controller.open(tx, None),
        Err(CaptureError::DeviceError(_))
    ));
    assert_eq!(controller.state(), SessionState::Error);
}
