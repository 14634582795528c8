//! Hardware seam for the camera backend.
//!
//! Drivers deliver every asynchronous completion as a [`CameraEvent`] on the
//! channel handed to [`CameraDriver::open`]; they never mutate controller
//! state from their own context. The pipeline worker drains the channel and
//! feeds the controller's state machine.

use crossbeam_channel::Sender;

/// One encoded still frame as delivered by the sensor.
///
/// `data` holds the encoded byte plane (JPEG on real hardware); `width` and
/// `height` are the sensor-reported geometry of the encoded image.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Asynchronous completions from the driver context.
#[derive(Debug, Clone)]
pub enum CameraEvent {
    /// The device finished opening and is ready for session configuration.
    Opened,
    /// The device was disconnected out from under us.
    Disconnected,
    /// The device reported a hardware fault.
    DeviceError(String),
    /// The requested capture session is configured and usable.
    SessionConfigured,
    /// The hardware rejected the session configuration.
    SessionConfigFailed,
    /// A single-shot capture finished and produced a frame.
    CaptureCompleted { request_id: u64, frame: RawFrame },
    /// The device handle finished closing.
    Closed,
}

/// Contract for one physical camera backend.
///
/// All methods are invoked from the pipeline worker; completions arrive as
/// [`CameraEvent`] messages on the sender supplied to `open`. Implementations
/// must tolerate `close_session`/`close_device` being called while a request
/// is still in flight and may deliver late events afterwards; the controller
/// treats those as no-ops.
pub trait CameraDriver: Send {
    /// Identifiers of the cameras this backend can see, discovery order.
    fn camera_ids(&self) -> Vec<String>;

    /// Ask the device to open with a frame sink of the given geometry.
    /// Completion arrives as `Opened` (or `DeviceError`) on `events`.
    fn open(
        &mut self,
        camera_id: &str,
        width: u32,
        height: u32,
        events: Sender<CameraEvent>,
    ) -> anyhow::Result<()>;

    /// Ask the device to configure a still-capture session targeting the
    /// frame sink. Completion arrives as `SessionConfigured` or
    /// `SessionConfigFailed`.
    fn configure_session(&mut self) -> anyhow::Result<()>;

    /// Submit the single still-capture request within the active session.
    /// Completion arrives as `CaptureCompleted` carrying `request_id`.
    fn submit_capture(&mut self, request_id: u64) -> anyhow::Result<()>;

    /// Tear down the active capture session, if any.
    fn close_session(&mut self);

    /// Release the device handle. The controller guarantees at most one call
    /// per open lifecycle; the driver should answer with `Closed`.
    fn close_device(&mut self);
}
