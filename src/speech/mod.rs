//! Spoken-output types and the speech-synthesis seam.
//!
//! The synthesis engine itself is an external collaborator behind
//! [`SpeechSink`]; this module owns what gets said and when. The
//! [`AnnouncementScheduler`] decides phrasing and applies the joke-cooldown
//! policy.

mod scheduler;

pub use scheduler::{
    AnnouncementScheduler, HUMOR_THRESHOLD, JOKE_COOLDOWN_MS, SINGLE_ANSWER_CONFIDENCE_THRESHOLD,
};

/// Pitch/rate overrides for one utterance. `1.0` is the engine's neutral
/// voice on both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prosody {
    pub pitch: f32,
    pub rate: f32,
}

impl Default for Prosody {
    fn default() -> Self {
        Self {
            pitch: 1.0,
            rate: 1.0,
        }
    }
}

/// Completions reported by the synthesis engine, marshaled onto the
/// pipeline worker's channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    UtteranceStarted,
    UtteranceError(String),
    /// The whole queued batch finished playing.
    QueueDrained,
}

/// Ordered utterance queue of a speech-synthesis engine.
///
/// `enqueue` appends to the engine's queue; `commit` starts playback of the
/// queued batch. Completions surface as [`SpeechEvent`]s on a channel the
/// embedder wires up alongside the sink. Synchronous sinks may report
/// `QueueDrained` from inside `commit`.
pub trait SpeechSink: Send {
    fn enqueue(&mut self, text: &str, prosody: Prosody);
    fn commit(&mut self);
}

/// One fixed thing the device can say. The variant set is closed: prosody
/// differences are data, not subtypes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Utterance {
    Plain(&'static str),
    Accented {
        text: &'static str,
        pitch: f32,
        rate: f32,
    },
}

impl Utterance {
    pub fn speak(&self, sink: &mut dyn SpeechSink) {
        match *self {
            Utterance::Plain(text) => sink.enqueue(text, Prosody::default()),
            Utterance::Accented { text, pitch, rate } => {
                sink.enqueue(text, Prosody { pitch, rate })
            }
        }
    }

    pub fn text(&self) -> &'static str {
        match *self {
            Utterance::Plain(text) => text,
            Utterance::Accented { text, .. } => text,
        }
    }
}
