//! Orchestrates capture → tensor → inference → rank → announce.
//!
//! One dedicated worker thread owns the capture controller, the tensor
//! builder, the classifier, and the announcement scheduler; everything
//! reaches it as a message. Hardware callbacks and speech completions are
//! marshaled over channels, and the only cross-thread mutable value is the
//! readiness flag, which gates trigger dispatch with an atomic
//! compare-exchange. Triggers that arrive while a capture is still being
//! announced are dropped, not queued.

use crate::camera::{
    CameraDriver, CameraEvent, CaptureSessionController, ControllerOutcome, RawFrame,
    SessionState, IMAGE_HEIGHT, IMAGE_WIDTH,
};
use crate::classify::{self, Classifier, Recognition};
use crate::log_debug;
use crate::speech::{AnnouncementScheduler, SpeechEvent, SpeechSink};
use crate::vision::{ImageTensorBuilder, Rotation};
use anyhow::Result;
use crossbeam_channel::{never, select, unbounded, Receiver, Sender};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

/// Hardware readiness indicator (e.g. an LED) mirroring the readiness flag.
pub trait ReadySignal: Send {
    fn set_ready(&mut self, ready: bool);
}

/// A speech sink together with the channel its completions arrive on.
pub struct SpeechOutput {
    pub sink: Box<dyn SpeechSink>,
    pub events: Receiver<SpeechEvent>,
}

/// Messages from the interactive side into the worker.
#[derive(Debug)]
pub enum WorkerCommand {
    Trigger,
    SetHumor(bool),
    Shutdown,
}

/// Observable pipeline milestones, serializable for external presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    Ready { ready: bool },
    Results { results: Vec<Recognition> },
    StageFailed { stage: String, message: String },
}

/// Tunables threaded through from the CLI.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Preferred camera identifier; first discovered when absent.
    pub camera: Option<String>,
    /// Sensor mounting orientation.
    pub rotation: Rotation,
    /// Whether jokes may be inserted at all.
    pub humor: bool,
    /// Joke anti-repetition window.
    pub joke_cooldown_ms: u64,
    /// Seed for deterministic humor, used by tests and demos.
    pub seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            camera: None,
            rotation: Rotation::None,
            humor: true,
            joke_cooldown_ms: crate::speech::JOKE_COOLDOWN_MS,
            seed: None,
        }
    }
}

/// Handle the interactive side uses to drive the worker.
///
/// Dropping the handle shuts the pipeline down and joins the worker.
pub struct PipelineHandle {
    commands: Sender<WorkerCommand>,
    ready: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl PipelineHandle {
    /// Dispatch a capture if the pipeline is ready.
    ///
    /// Returns `false` when the previous capture has not finished announcing;
    /// the trigger is dropped, never queued. The ready→busy flip is a single
    /// compare-exchange so two racing triggers cannot both win.
    pub fn trigger(&self) -> bool {
        if self
            .ready
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let _ = self.commands.send(WorkerCommand::Trigger);
            true
        } else {
            log_debug("pipeline: trigger dropped, previous capture still in flight");
            false
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn set_humor(&self, humor: bool) {
        let _ = self.commands.send(WorkerCommand::SetHumor(humor));
    }

    /// Stop the worker and release the camera. Idempotent via Drop.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.commands.send(WorkerCommand::Shutdown);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Open the camera and spawn the pipeline worker.
///
/// `NoCameraFound` (and any other open-dispatch failure) surfaces here as a
/// fatal startup error; everything after this point is handled in-worker
/// with readiness restoration.
pub fn start_pipeline(
    driver: Box<dyn CameraDriver>,
    classifier: Box<dyn Classifier>,
    labels: Vec<String>,
    speech: Option<SpeechOutput>,
    ready_signal: Option<Box<dyn ReadySignal>>,
    observer: Option<Sender<PipelineEvent>>,
    config: PipelineConfig,
) -> Result<PipelineHandle> {
    let (camera_tx, camera_rx) = unbounded();
    let (command_tx, command_rx) = unbounded();

    let mut controller = CaptureSessionController::new(driver, IMAGE_WIDTH, IMAGE_HEIGHT);
    controller.open(camera_tx.clone(), config.camera.as_deref())?;

    let mut scheduler = match config.seed {
        Some(seed) => AnnouncementScheduler::with_seed(config.joke_cooldown_ms, seed),
        None => AnnouncementScheduler::new(config.joke_cooldown_ms),
    };
    scheduler.set_humor(config.humor);

    let (sink, speech_events) = match speech {
        Some(output) => (Some(output.sink), output.events),
        None => (None, never()),
    };

    let ready = Arc::new(AtomicBool::new(false));
    let worker = PipelineWorker {
        controller,
        camera_tx,
        camera_pref: config.camera,
        builder: ImageTensorBuilder::new(IMAGE_WIDTH, IMAGE_HEIGHT).with_rotation(config.rotation),
        classifier,
        labels,
        scheduler,
        sink,
        ready: ready.clone(),
        ready_signal,
        observer,
        awaiting_speech: false,
        capture_after_open: false,
    };
    let handle = thread::Builder::new()
        .name("snapspeak-pipeline".to_string())
        .spawn(move || worker.run(command_rx, camera_rx, speech_events))?;

    Ok(PipelineHandle {
        commands: command_tx,
        ready,
        worker: Some(handle),
    })
}

struct PipelineWorker {
    controller: CaptureSessionController,
    camera_tx: Sender<CameraEvent>,
    camera_pref: Option<String>,
    builder: ImageTensorBuilder,
    classifier: Box<dyn Classifier>,
    labels: Vec<String>,
    scheduler: AnnouncementScheduler,
    sink: Option<Box<dyn SpeechSink>>,
    ready: Arc<AtomicBool>,
    ready_signal: Option<Box<dyn ReadySignal>>,
    observer: Option<Sender<PipelineEvent>>,
    awaiting_speech: bool,
    capture_after_open: bool,
}

/// What one `select!` turn resolved to. Channel borrows end with the select
/// expression, so the worker is free to mutate itself while acting.
enum Step {
    Command(Option<WorkerCommand>),
    Camera(Option<CameraEvent>),
    Speech(Option<SpeechEvent>),
}

impl PipelineWorker {
    fn run(
        mut self,
        commands: Receiver<WorkerCommand>,
        camera_events: Receiver<CameraEvent>,
        mut speech_events: Receiver<SpeechEvent>,
    ) {
        log_debug("pipeline: worker started");
        tracing::info!(labels = self.labels.len(), "pipeline worker started");

        if let Some(sink) = self.sink.as_mut() {
            self.scheduler.announce_ready(sink.as_mut());
            sink.commit();
        }
        self.restore_ready();

        loop {
            let step = select! {
                recv(commands) -> command => Step::Command(command.ok()),
                recv(camera_events) -> event => Step::Camera(event.ok()),
                recv(speech_events) -> event => Step::Speech(event.ok()),
            };
            match step {
                Step::Command(Some(WorkerCommand::Trigger)) => self.handle_trigger(),
                Step::Command(Some(WorkerCommand::SetHumor(humor))) => {
                    self.scheduler.set_humor(humor)
                }
                Step::Command(Some(WorkerCommand::Shutdown)) | Step::Command(None) => break,
                Step::Camera(Some(event)) => self.handle_camera_event(event),
                Step::Camera(None) => break,
                Step::Speech(Some(event)) => self.handle_speech_event(event),
                // Sink side hung up; stop selecting on it.
                Step::Speech(None) => speech_events = never(),
            }
        }

        self.controller.shutdown();
        log_debug("pipeline: worker stopped");
    }

    /// One user-triggered capture. The readiness flag is already false; the
    /// worker mirrors that to the indicator and dispatches the capture.
    fn handle_trigger(&mut self) {
        self.publish_ready(false);
        log_debug("pipeline: trigger accepted");

        if let Some(sink) = self.sink.as_mut() {
            self.scheduler.announce_shutter(sink.as_mut());
            sink.commit();
        }

        match self.controller.state() {
            // A previous recoverable device error closed the lifecycle;
            // start a fresh one and capture on the Opened callback.
            SessionState::Closed => {
                match self
                    .controller
                    .open(self.camera_tx.clone(), self.camera_pref.as_deref())
                {
                    Ok(()) => self.capture_after_open = true,
                    Err(err) => self.stage_failed("capture", &err.to_string()),
                }
            }
            // Device open still in flight; capture once it lands.
            SessionState::Opening => self.capture_after_open = true,
            _ => {
                if let Err(err) = self.controller.capture() {
                    self.stage_failed("capture", &err.to_string());
                }
            }
        }
    }

    fn handle_camera_event(&mut self, event: CameraEvent) {
        match self.controller.handle_event(event) {
            ControllerOutcome::None => {
                if self.capture_after_open && self.controller.state() == SessionState::Open {
                    self.capture_after_open = false;
                    if let Err(err) = self.controller.capture() {
                        self.stage_failed("capture", &err.to_string());
                    }
                }
            }
            ControllerOutcome::FrameReady(frame) => self.process_frame(frame),
            ControllerOutcome::Failed(err) => {
                self.capture_after_open = false;
                self.stage_failed("capture", &err.to_string());
            }
        }
    }

    /// Frame → tensor → scores → ranked results → announcement.
    ///
    /// Any failure drops the frame and restores readiness; no partial result
    /// is ever announced.
    fn process_frame(&mut self, frame: RawFrame) {
        tracing::debug!(width = frame.width, height = frame.height, "frame ready");

        let tensor = match self.builder.build(&frame) {
            Ok(tensor) => tensor,
            Err(err) => {
                self.stage_failed("preprocess", &err.to_string());
                return;
            }
        };
        let scores = match self.classifier.classify(&tensor) {
            Ok(scores) => scores,
            Err(err) => {
                self.stage_failed("inference", &format!("{err:#}"));
                return;
            }
        };

        let results = classify::rank(&scores, &self.labels);
        log_debug(&format!("pipeline: ranked {} result(s)", results.len()));
        tracing::info!(results = results.len(), "capture classified");
        self.emit(PipelineEvent::Results {
            results: results.clone(),
        });

        if let Some(sink) = self.sink.as_mut() {
            self.scheduler
                .announce_results(sink.as_mut(), &results, unix_millis());
            sink.commit();
            self.awaiting_speech = true;
        } else {
            // No speech configured: nothing to wait for.
            self.restore_ready();
        }
    }

    fn handle_speech_event(&mut self, event: SpeechEvent) {
        match event {
            SpeechEvent::UtteranceStarted => {}
            SpeechEvent::UtteranceError(message) => {
                log_debug(&format!("pipeline: speech error: {message}"));
                if self.awaiting_speech {
                    self.awaiting_speech = false;
                    self.restore_ready();
                }
            }
            SpeechEvent::QueueDrained => {
                if self.awaiting_speech {
                    self.awaiting_speech = false;
                    self.restore_ready();
                }
            }
        }
    }

    /// Recoverable failure: log it, surface it, and never leave the trigger
    /// path deadlocked.
    fn stage_failed(&mut self, stage: &str, message: &str) {
        log_debug(&format!("pipeline: {stage} failed: {message}"));
        tracing::warn!(stage, message, "pipeline stage failed");
        self.emit(PipelineEvent::StageFailed {
            stage: stage.to_string(),
            message: message.to_string(),
        });
        self.awaiting_speech = false;
        self.restore_ready();
    }

    fn restore_ready(&mut self) {
        self.ready.store(true, Ordering::Release);
        self.publish_ready(true);
    }

    /// Mirror readiness to the indicator and the observer stream.
    fn publish_ready(&mut self, ready: bool) {
        if let Some(signal) = self.ready_signal.as_mut() {
            signal.set_ready(ready);
        }
        self.emit(PipelineEvent::Ready { ready });
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(observer) = &self.observer {
            let _ = observer.send(event);
        }
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
