//! Viewer configuration.
//!
//! Every field has a default, so an empty (or partial) YAML file is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::{MODEL_MAX_HEIGHT, TILE_SIZE};

/// Vertical field of view of the main camera.
pub const FIELD_OF_VIEW_DEGREES: f32 = 60.0;

/// Steepest allowed pitch for the main camera.
///
/// The top edge of the screen must look at least this far below the horizon
/// so every corner ray meets the ground in front of the camera.
pub const MAX_PITCH_DEGREES: f32 = -(FIELD_OF_VIEW_DEGREES / 2.0 + 5.0);

/// Errors from loading or saving a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Main camera parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Camera height above the ground plane.
    pub height: f32,
    pub pitch_degrees: f32,
    pub yaw_degrees: f32,
    /// Fraction of the remaining distance to the target covered per update.
    pub smoothing: f32,
    /// Internal render resolution the projection is built for.
    pub viewport_width: f32,
    pub viewport_height: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            height: 350.0,
            pitch_degrees: -45.0,
            yaw_degrees: 0.0,
            smoothing: 0.05,
            viewport_width: 512.0,
            viewport_height: 288.0,
        }
    }
}

/// Grid and streaming parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    pub tile_size: f32,
    pub max_height: f32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            tile_size: TILE_SIZE,
            max_height: MODEL_MAX_HEIGHT,
        }
    }
}

/// Top-level viewer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub camera: CameraSettings,
    pub world: WorldSettings,
    /// Camera focus speed in world units per second.
    pub move_speed: f32,
    /// Nudge applied to picked positions so cell edges round consistently.
    pub pick_bias: f32,
    /// Directory of the tile database.
    pub data_dir: PathBuf,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            camera: CameraSettings::default(),
            world: WorldSettings::default(),
            move_speed: 500.0,
            pick_bias: 0.01,
            data_dir: PathBuf::from("./tile_data"),
        }
    }
}

impl ViewerConfig {
    /// Load and validate a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let camera = &self.camera;
        if camera.viewport_width <= 0.0 || camera.viewport_height <= 0.0 {
            return Err(ConfigError::Invalid("viewport must be positive".into()));
        }
        if !(-90.0 < camera.pitch_degrees && camera.pitch_degrees <= MAX_PITCH_DEGREES) {
            return Err(ConfigError::Invalid(format!(
                "pitch {} must lie in (-90, {MAX_PITCH_DEGREES}] degrees",
                camera.pitch_degrees
            )));
        }
        if camera.height <= 0.0 {
            return Err(ConfigError::Invalid("camera height must be positive".into()));
        }
        if !(0.0..=1.0).contains(&camera.smoothing) {
            return Err(ConfigError::Invalid("smoothing must lie in [0, 1]".into()));
        }
        if self.world.tile_size <= 0.0 {
            return Err(ConfigError::Invalid("tile_size must be positive".into()));
        }
        if !(0.0..camera.height).contains(&self.world.max_height) {
            return Err(ConfigError::Invalid(
                "max_height must lie in [0, camera height)".into(),
            ));
        }
        Ok(())
    }
}
