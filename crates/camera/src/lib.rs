//! Viewer camera: derives view/projection matrices from a pose, unprojects
//! screen points onto horizontal planes and reports the visible ground area.
//!
//! # Invariants
//! - Derived matrices are only valid after `update()` following a mutation.
//! - The projection kind is fixed at construction.
//! - Camera motion is smoothed toward the target once per `update()` call.

mod camera;
mod rig;

pub use camera::{Camera, ProjectionKind};
pub use rig::CameraRig;
