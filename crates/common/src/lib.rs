//! Shared types for the tile viewer: model catalog, grid coordinates,
//! the persistence contract and viewer configuration.
//!
//! # Invariants
//! - Model ids are dense; id 0 is the default model of an empty cell.
//! - Cell rectangles are half-open and iterate x outer, z inner.

pub mod config;
mod model;
mod tiles;
mod types;

pub use config::{
    CameraSettings, ConfigError, FIELD_OF_VIEW_DEGREES, MAX_PITCH_DEGREES, ViewerConfig,
    WorldSettings,
};
pub use model::{MODEL_MAX_HEIGHT, Model, ModelInfo, TILE_SIZE};
pub use tiles::TilePersistence;
pub use types::{CellCoord, CellRect, GroundRect, SavedPosition, TileRecord};
