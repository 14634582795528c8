//! Offline harness: a simulated camera, classifier, and speech sink.
//!
//! Lets the binary and the integration tests drive the full
//! trigger→capture→announce cycle without camera hardware, an inference
//! runtime, or a synthesis engine attached. The simulated driver honors the
//! real callback contract: every completion arrives as a [`CameraEvent`] on
//! the controller's channel, never as a direct return value.

use crate::camera::{CameraDriver, CameraEvent, RawFrame};
use crate::classify::Classifier;
use crate::speech::{Prosody, SpeechEvent, SpeechSink};
use crate::vision::Tensor;
use anyhow::{bail, Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use image::{Rgb, RgbImage};
use std::io::Cursor;

/// Camera backend that synthesizes a JPEG test pattern per capture.
///
/// Events are sent synchronously from within the driver calls; the worker
/// drains them on its next loop turn, which exercises the same ordering as
/// real hardware callbacks.
pub struct SimCameraDriver {
    events: Option<Sender<CameraEvent>>,
    /// Geometry of produced frames; `None` follows the open request. Forcing
    /// a different geometry simulates a sensor that ignores the requested
    /// sink size.
    forced_size: Option<(u32, u32)>,
    open_size: (u32, u32),
    shot: u32,
}

impl SimCameraDriver {
    pub fn new() -> Self {
        Self {
            events: None,
            forced_size: None,
            open_size: (0, 0),
            shot: 0,
        }
    }

    /// Produce frames of a fixed geometry regardless of the open request.
    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.forced_size = Some((width, height));
        self
    }

    fn send(&self, event: CameraEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

impl Default for SimCameraDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraDriver for SimCameraDriver {
    fn camera_ids(&self) -> Vec<String> {
        vec!["sim0".to_string()]
    }

    fn open(
        &mut self,
        camera_id: &str,
        width: u32,
        height: u32,
        events: Sender<CameraEvent>,
    ) -> Result<()> {
        if camera_id != "sim0" {
            bail!("unknown simulated camera '{camera_id}'");
        }
        self.open_size = (width, height);
        self.events = Some(events);
        self.send(CameraEvent::Opened);
        Ok(())
    }

    fn configure_session(&mut self) -> Result<()> {
        self.send(CameraEvent::SessionConfigured);
        Ok(())
    }

    fn submit_capture(&mut self, request_id: u64) -> Result<()> {
        let (width, height) = self.forced_size.unwrap_or(self.open_size);
        self.shot = self.shot.wrapping_add(1);
        let frame = synth_frame(width, height, self.shot)?;
        self.send(CameraEvent::CaptureCompleted { request_id, frame });
        Ok(())
    }

    fn close_session(&mut self) {}

    fn close_device(&mut self) {
        self.send(CameraEvent::Closed);
        self.events = None;
    }
}

/// Encode a deterministic gradient test pattern as JPEG.
fn synth_frame(width: u32, height: u32, shot: u32) -> Result<RawFrame> {
    let phase = shot.wrapping_mul(31);
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            ((x + phase) % 256) as u8,
            ((y + phase) % 256) as u8,
            ((x + y) % 256) as u8,
        ])
    });
    let mut data = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut data), image::ImageFormat::Jpeg)
        .context("encode simulated frame")?;
    Ok(RawFrame {
        width,
        height,
        data,
    })
}

/// Stand-in inference engine: deterministic pseudo-scores derived from
/// tensor statistics, spread over the label count.
pub struct SimClassifier {
    classes: usize,
}

impl SimClassifier {
    pub fn new(classes: usize) -> Self {
        Self { classes }
    }
}

impl Classifier for SimClassifier {
    fn classify(&self, tensor: &Tensor) -> Result<Vec<f32>> {
        if self.classes == 0 {
            bail!("simulated model has no classes configured");
        }
        let data = tensor.data();
        let mean = data.iter().sum::<f32>() / data.len().max(1) as f32;
        // Deterministic in the input bytes; one dominant class plus a tail.
        let dominant = (mean.abs() as usize) % self.classes;
        let mut scores = vec![0.0f32; self.classes];
        scores[dominant] = 0.72;
        scores[(dominant + 1) % self.classes] = 0.31;
        scores[(dominant + 2) % self.classes] = 0.14;
        Ok(scores)
    }
}

/// Labels for the simulated classifier, index-aligned with its scores.
pub fn sim_labels() -> Vec<String> {
    [
        "goldfish", "toaster", "acorn", "llama", "teapot", "canoe", "umbrella", "banjo",
        "cabbage", "lighthouse",
    ]
    .iter()
    .map(|label| label.to_string())
    .collect()
}

/// Speech sink that prints utterances to stdout and reports the queue as
/// drained on commit.
pub struct SimSpeechSink {
    events: Sender<SpeechEvent>,
    queued: usize,
}

impl SimSpeechSink {
    pub fn new() -> (Self, Receiver<SpeechEvent>) {
        let (tx, rx) = unbounded();
        (
            Self {
                events: tx,
                queued: 0,
            },
            rx,
        )
    }
}

impl SpeechSink for SimSpeechSink {
    fn enqueue(&mut self, text: &str, prosody: Prosody) {
        self.queued += 1;
        if prosody == Prosody::default() {
            println!("[speech] {text}");
        } else {
            println!(
                "[speech] {text} (pitch {:.1}, rate {:.1})",
                prosody.pitch, prosody.rate
            );
        }
        let _ = self.events.send(SpeechEvent::UtteranceStarted);
    }

    fn commit(&mut self) {
        if self.queued > 0 {
            self.queued = 0;
            let _ = self.events.send(SpeechEvent::QueueDrained);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{IMAGE_HEIGHT, IMAGE_WIDTH};
    use crate::vision::ImageTensorBuilder;

    #[test]
    fn sim_driver_runs_the_full_callback_sequence() {
        let (tx, rx) = unbounded();
        let mut driver = SimCameraDriver::new();
        driver
            .open("sim0", IMAGE_WIDTH, IMAGE_HEIGHT, tx)
            .expect("open");
        driver.configure_session().expect("configure");
        driver.submit_capture(42).expect("submit");
        driver.close_device();

        assert!(matches!(rx.recv().unwrap(), CameraEvent::Opened));
        assert!(matches!(rx.recv().unwrap(), CameraEvent::SessionConfigured));
        match rx.recv().unwrap() {
            CameraEvent::CaptureCompleted { request_id, frame } => {
                assert_eq!(request_id, 42);
                assert_eq!((frame.width, frame.height), (IMAGE_WIDTH, IMAGE_HEIGHT));
                assert!(!frame.data.is_empty());
            }
            other => panic!("expected capture completion, got {other:?}"),
        }
        assert!(matches!(rx.recv().unwrap(), CameraEvent::Closed));
    }

    #[test]
    fn sim_frames_decode_and_classify_deterministically() {
        let (tx, rx) = unbounded();
        let mut driver = SimCameraDriver::new();
        driver
            .open("sim0", IMAGE_WIDTH, IMAGE_HEIGHT, tx)
            .expect("open");
        driver.submit_capture(1).expect("submit");
        let _opened = rx.recv().unwrap();
        let frame = match rx.recv().unwrap() {
            CameraEvent::CaptureCompleted { frame, .. } => frame,
            other => panic!("expected capture completion, got {other:?}"),
        };

        let builder = ImageTensorBuilder::new(IMAGE_WIDTH, IMAGE_HEIGHT);
        let tensor = builder.build(&frame).expect("decode");
        let classifier = SimClassifier::new(sim_labels().len());
        let first = classifier.classify(&tensor).expect("classify");
        let second = classifier.classify(&tensor).expect("classify");
        assert_eq!(first, second);
        assert_eq!(first.len(), sim_labels().len());
    }

    #[test]
    fn sim_sink_reports_drain_only_after_enqueue() {
        let (mut sink, events) = SimSpeechSink::new();
        sink.commit();
        assert!(events.try_recv().is_err());

        sink.enqueue("hello", Prosody::default());
        sink.commit();
        assert_eq!(events.recv().unwrap(), SpeechEvent::UtteranceStarted);
        assert_eq!(events.recv().unwrap(), SpeechEvent::QueueDrained);
    }
}
