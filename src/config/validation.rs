use super::defaults::{MAX_JOKE_COOLDOWN_MS, MIN_JOKE_COOLDOWN_MS};
use super::AppConfig;
use crate::pipeline::PipelineConfig;
use crate::vision::Rotation;
use anyhow::{bail, Result};
use clap::Parser;

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values before anything touches hardware.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_JOKE_COOLDOWN_MS..=MAX_JOKE_COOLDOWN_MS).contains(&self.joke_cooldown_ms) {
            bail!(
                "--joke-cooldown-ms must be between {MIN_JOKE_COOLDOWN_MS} and {MAX_JOKE_COOLDOWN_MS}, got {}",
                self.joke_cooldown_ms
            );
        }

        if !matches!(self.sensor_orientation, 0 | 90 | 180 | 270) {
            bail!(
                "--sensor-orientation must be one of 0, 90, 180, 270, got {}",
                self.sensor_orientation
            );
        }

        if let Some(path) = &self.labels {
            if !path.is_file() {
                bail!("--labels file {} does not exist", path.display());
            }
        }

        Ok(())
    }

    /// Sensor orientation as the builder's rotation. Call after `validate`.
    pub fn rotation(&self) -> Rotation {
        match self.sensor_orientation {
            90 => Rotation::Deg90,
            180 => Rotation::Deg180,
            270 => Rotation::Deg270,
            _ => Rotation::None,
        }
    }

    /// Tunables handed to the pipeline worker.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            camera: self.camera.clone(),
            rotation: self.rotation(),
            humor: !self.no_humor,
            joke_cooldown_ms: self.joke_cooldown_ms,
            seed: self.seed,
        }
    }
}
