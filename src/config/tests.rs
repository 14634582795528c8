use super::defaults::{DEFAULT_JOKE_COOLDOWN_MS, MAX_JOKE_COOLDOWN_MS};
use super::AppConfig;
use crate::vision::Rotation;
use clap::Parser;

fn base_config() -> AppConfig {
    AppConfig::parse_from(["test-app"])
}

#[test]
fn defaults_are_valid() {
    let cfg = base_config();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.joke_cooldown_ms, DEFAULT_JOKE_COOLDOWN_MS);
    assert!(!cfg.no_humor);
    assert!(!cfg.quiet);
}

#[test]
fn rejects_joke_cooldown_out_of_bounds() {
    let cfg = AppConfig::parse_from(["test-app", "--joke-cooldown-ms", "10"]);
    assert!(cfg.validate().is_err());

    let over = (MAX_JOKE_COOLDOWN_MS + 1).to_string();
    let cfg = AppConfig::parse_from(["test-app", "--joke-cooldown-ms", &over]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_unsupported_sensor_orientation() {
    let cfg = AppConfig::parse_from(["test-app", "--sensor-orientation", "45"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_missing_labels_file() {
    let cfg = AppConfig::parse_from(["test-app", "--labels", "/no/such/labels.txt"]);
    assert!(cfg.validate().is_err());
}

#[test]
fn rotation_maps_orientation_degrees() {
    let cfg = AppConfig::parse_from(["test-app", "--sensor-orientation", "90"]);
    assert_eq!(cfg.rotation(), Rotation::Deg90);
    let cfg = AppConfig::parse_from(["test-app", "--sensor-orientation", "270"]);
    assert_eq!(cfg.rotation(), Rotation::Deg270);
    assert_eq!(base_config().rotation(), Rotation::None);
}

#[test]
fn pipeline_config_mirrors_flags() {
    let cfg = AppConfig::parse_from([
        "test-app",
        "--camera",
        "cam1",
        "--no-humor",
        "--joke-cooldown-ms",
        "60000",
        "--seed",
        "9",
    ]);
    let pipeline = cfg.pipeline_config();
    assert_eq!(pipeline.camera.as_deref(), Some("cam1"));
    assert!(!pipeline.humor);
    assert_eq!(pipeline.joke_cooldown_ms, 60_000);
    assert_eq!(pipeline.seed, Some(9));
}
