//! SnapSpeak: an embedded camera classifier that speaks what it sees.
//!
//! Single-shot capture → tensor preprocessing → inference (external) →
//! ranked recognitions → spoken announcement, all serialized on one pipeline
//! worker. The inference engine, speech synthesizer, readiness indicator,
//! and UI are external collaborators behind trait seams.

pub mod camera;
pub mod classify;
pub mod config;
mod logging;
pub mod pipeline;
pub mod sim;
pub mod speech;
mod telemetry;
pub mod vision;

pub use logging::{crash_log_path, init_logging, log_debug, log_file_path, log_panic};
pub use pipeline::{
    start_pipeline, PipelineConfig, PipelineEvent, PipelineHandle, ReadySignal, SpeechOutput,
};
pub use telemetry::init_tracing;
