//! Command-line parsing and validation helpers.

mod defaults;
#[cfg(test)]
mod tests;
mod validation;

use clap::Parser;
use std::path::PathBuf;

pub use defaults::{DEFAULT_JOKE_COOLDOWN_MS, MAX_JOKE_COOLDOWN_MS, MIN_JOKE_COOLDOWN_MS};

/// CLI options for the snapspeak pipeline. Validated values keep the worker
/// free of range checks.
#[derive(Debug, Parser, Clone)]
#[command(about = "SnapSpeak camera classifier", author, version)]
pub struct AppConfig {
    /// Preferred camera identifier (first discovered when omitted)
    #[arg(long)]
    pub camera: Option<String>,

    /// Print detected camera identifiers and exit
    #[arg(long = "list-cameras", default_value_t = false)]
    pub list_cameras: bool,

    /// Path to the label table, one class per line, index-aligned with the
    /// model output
    #[arg(long, env = "SNAPSPEAK_LABELS")]
    pub labels: Option<PathBuf>,

    /// Sensor mounting orientation in degrees (0, 90, 180, 270)
    #[arg(long = "sensor-orientation", default_value_t = 0)]
    pub sensor_orientation: u32,

    /// Disable joke insertion entirely
    #[arg(long = "no-humor", default_value_t = false)]
    pub no_humor: bool,

    /// Joke anti-repetition window (milliseconds)
    #[arg(long = "joke-cooldown-ms", default_value_t = DEFAULT_JOKE_COOLDOWN_MS)]
    pub joke_cooldown_ms: u64,

    /// Seed for deterministic announcement randomness
    #[arg(long)]
    pub seed: Option<u64>,

    /// Run without a speech sink (readiness restores immediately)
    #[arg(long = "quiet", default_value_t = false)]
    pub quiet: bool,

    /// Emit pipeline events as JSON lines on stdout
    #[arg(long = "json-events", default_value_t = false)]
    pub json_events: bool,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "SNAPSPEAK_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "SNAPSPEAK_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Enable verbose timing logs
    #[arg(long)]
    pub log_timings: bool,
}
