//! Camera capture: driver seam, event marshaling, and the session state
//! machine.
//!
//! Hardware callbacks are delivered as [`CameraEvent`] messages over a
//! crossbeam channel and replayed into [`CaptureSessionController`] by the
//! pipeline worker, so session state has exactly one mutator.

/// Sensor frame width requested from the driver.
pub const IMAGE_WIDTH: u32 = 640;

/// Sensor frame height requested from the driver.
pub const IMAGE_HEIGHT: u32 = 480;

mod controller;
mod driver;
#[cfg(test)]
mod tests;

pub use controller::{CaptureError, CaptureSessionController, ControllerOutcome, SessionState};
pub use driver::{CameraDriver, CameraEvent, RawFrame};
