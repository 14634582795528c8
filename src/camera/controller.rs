//! Capture session state machine.
//!
//! Owns the device handle and the active still-capture session, sequencing
//! open → configure → capture against asynchronous driver callbacks. All
//! mutation happens on the pipeline worker; driver contexts only enqueue
//! [`CameraEvent`]s.

use super::driver::{CameraDriver, CameraEvent, RawFrame};
use crate::log_debug;
use crossbeam_channel::Sender;
use thiserror::Error;

/// Lifecycle of one open-device/active-session span.
///
/// `Closed` and `Error` are terminal for the current lifecycle; a fresh
/// `open()` from either `Idle` or `Closed` begins a new one. There is no
/// mid-lifecycle reuse.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Opening,
    Open,
    SessionConfiguring,
    SessionReady,
    Capturing,
    Closing,
    Closed,
    Error,
}

/// Classified capture-path failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("no camera devices found")]
    NoCameraFound,
    #[error("camera not initialized")]
    NotInitialized,
    #[error("camera device error: {0}")]
    DeviceError(String),
    #[error("camera session configuration rejected by hardware")]
    SessionConfigFailed,
}

/// What the worker should do after the controller absorbed a driver event.
#[derive(Debug)]
pub enum ControllerOutcome {
    /// Nothing actionable; the state machine advanced (or ignored a stray).
    None,
    /// The single-shot capture finished; exactly one frame per request.
    FrameReady(RawFrame),
    /// A failure the orchestrator should log and recover from.
    Failed(CaptureError),
}

/// State machine driving a single camera through open/configure/capture.
///
/// Invariants enforced here rather than trusted to callers:
/// - a capture request is only submitted from `SessionReady`, and at most
///   one request is in flight per session;
/// - the device handle is released exactly once per lifecycle, no matter how
///   `shutdown()` races a late error callback;
/// - stray callbacks after close are checked no-ops.
pub struct CaptureSessionController {
    driver: Box<dyn CameraDriver>,
    state: SessionState,
    width: u32,
    height: u32,
    device_held: bool,
    session_active: bool,
    capture_wanted: bool,
    pending_request: Option<u64>,
    next_request_id: u64,
}

impl CaptureSessionController {
    pub fn new(driver: Box<dyn CameraDriver>, width: u32, height: u32) -> Self {
        Self {
            driver,
            state: SessionState::Idle,
            width,
            height,
            device_held: false,
            session_active: false,
            capture_wanted: false,
            pending_request: None,
            next_request_id: 1,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Identifiers the driver can see, for `--list-cameras`.
    pub fn camera_ids(&self) -> Vec<String> {
        self.driver.camera_ids()
    }

    /// Discover cameras and request the device to open.
    ///
    /// Picks `preferred` when given and discovered, otherwise the first
    /// discovered identifier. Legal from `Idle` or `Closed`; a call from
    /// `Closed` begins a fresh lifecycle after a recoverable device error.
    /// The `Opened` completion arrives later as a [`CameraEvent`].
    pub fn open(
        &mut self,
        events: Sender<CameraEvent>,
        preferred: Option<&str>,
    ) -> Result<(), CaptureError> {
        match self.state {
            SessionState::Idle | SessionState::Closed => {}
            _ => {
                return Err(CaptureError::DeviceError(format!(
                    "open() while {:?}",
                    self.state
                )))
            }
        }

        let ids = self.driver.camera_ids();
        if ids.is_empty() {
            log_debug("camera: no devices found");
            self.state = SessionState::Error;
            return Err(CaptureError::NoCameraFound);
        }
        let id = match preferred {
            Some(name) => match ids.iter().find(|candidate| candidate.as_str() == name) {
                Some(found) => found.clone(),
                None => {
                    self.state = SessionState::Error;
                    return Err(CaptureError::DeviceError(format!(
                        "camera '{name}' not found"
                    )));
                }
            },
            None => ids[0].clone(),
        };
        log_debug(&format!("camera: using device {id}"));

        if let Err(err) = self.driver.open(&id, self.width, self.height, events) {
            self.state = SessionState::Error;
            return Err(CaptureError::DeviceError(format!("{err:#}")));
        }
        // The in-flight open owns the underlying handle from here on.
        self.device_held = true;
        self.session_active = false;
        self.capture_wanted = false;
        self.pending_request = None;
        self.state = SessionState::Opening;
        Ok(())
    }

    /// Request a single still capture.
    ///
    /// From `Open` this first configures a session and submits the capture on
    /// the `SessionConfigured` callback; from `SessionReady` it submits
    /// immediately. Any other state is rejected.
    pub fn capture(&mut self) -> Result<(), CaptureError> {
        match self.state {
            SessionState::Open => {
                if let Err(err) = self.driver.configure_session() {
                    log_debug(&format!("camera: session configure rejected: {err:#}"));
                    return Err(CaptureError::SessionConfigFailed);
                }
                self.capture_wanted = true;
                self.state = SessionState::SessionConfiguring;
                Ok(())
            }
            SessionState::SessionReady => self.trigger_capture(),
            SessionState::Idle | SessionState::Opening => Err(CaptureError::NotInitialized),
            SessionState::SessionConfiguring | SessionState::Capturing => Err(
                CaptureError::DeviceError("capture already in flight".to_string()),
            ),
            SessionState::Closing | SessionState::Closed | SessionState::Error => Err(
                CaptureError::DeviceError("camera is closed".to_string()),
            ),
        }
    }

    /// Submit the still-capture request within the ready session.
    fn trigger_capture(&mut self) -> Result<(), CaptureError> {
        let request_id = self.next_request_id;
        if let Err(err) = self.driver.submit_capture(request_id) {
            log_debug(&format!("camera: capture submit failed: {err:#}"));
            return Err(CaptureError::DeviceError(format!("{err:#}")));
        }
        self.next_request_id += 1;
        self.pending_request = Some(request_id);
        self.state = SessionState::Capturing;
        log_debug(&format!("camera: capture request {request_id} submitted"));
        Ok(())
    }

    /// Absorb one asynchronous driver event.
    ///
    /// Events that no longer apply (arriving after a close, or carrying a
    /// stale request id) are dropped without touching state.
    pub fn handle_event(&mut self, event: CameraEvent) -> ControllerOutcome {
        match event {
            CameraEvent::Opened => {
                if self.state == SessionState::Opening {
                    log_debug("camera: device opened");
                    self.state = SessionState::Open;
                }
                ControllerOutcome::None
            }
            CameraEvent::SessionConfigured => {
                if self.state != SessionState::SessionConfiguring {
                    return ControllerOutcome::None;
                }
                self.session_active = true;
                self.state = SessionState::SessionReady;
                if self.capture_wanted {
                    self.capture_wanted = false;
                    match self.trigger_capture() {
                        Ok(()) => ControllerOutcome::None,
                        Err(err) => ControllerOutcome::Failed(err),
                    }
                } else {
                    ControllerOutcome::None
                }
            }
            CameraEvent::SessionConfigFailed => {
                if self.state != SessionState::SessionConfiguring {
                    return ControllerOutcome::None;
                }
                log_debug("camera: failed to configure session");
                self.capture_wanted = false;
                self.session_active = false;
                // Session stays unusable until the next capture() retries.
                self.state = SessionState::Open;
                ControllerOutcome::Failed(CaptureError::SessionConfigFailed)
            }
            CameraEvent::CaptureCompleted { request_id, frame } => {
                if self.state != SessionState::Capturing
                    || self.pending_request != Some(request_id)
                {
                    return ControllerOutcome::None;
                }
                self.pending_request = None;
                // One frame per session: close it and leave the device open
                // for the next capture() to configure afresh.
                self.driver.close_session();
                self.session_active = false;
                self.state = SessionState::Open;
                log_debug(&format!("camera: capture {request_id} complete, session closed"));
                ControllerOutcome::FrameReady(frame)
            }
            CameraEvent::Disconnected => self.fail("camera disconnected".to_string()),
            CameraEvent::DeviceError(message) => self.fail(message),
            CameraEvent::Closed => {
                if self.state == SessionState::Closing {
                    self.state = SessionState::Closed;
                }
                ControllerOutcome::None
            }
        }
    }

    /// Force the lifecycle down through `Closing`, releasing the handle.
    fn fail(&mut self, message: String) -> ControllerOutcome {
        match self.state {
            SessionState::Closing | SessionState::Closed | SessionState::Error => {
                // Already torn down; a late callback finds nothing to do.
                ControllerOutcome::None
            }
            _ => {
                log_debug(&format!("camera: device error, closing: {message}"));
                self.pending_request = None;
                self.capture_wanted = false;
                self.release();
                self.state = SessionState::Closing;
                ControllerOutcome::Failed(CaptureError::DeviceError(message))
            }
        }
    }

    /// Close any active session, then the device handle if still held.
    /// Safe to call any number of times; each resource is released once.
    fn release(&mut self) {
        if self.session_active {
            self.driver.close_session();
            self.session_active = false;
        }
        if self.device_held {
            self.driver.close_device();
            self.device_held = false;
        }
    }

    /// Idempotent teardown, callable from any state.
    pub fn shutdown(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        log_debug("camera: shutdown");
        self.pending_request = None;
        self.capture_wanted = false;
        self.release();
        self.state = SessionState::Closed;
    }
}
