//! wgpu render backend for the tile viewer.
//!
//! Draws one instanced box mesh per non-empty model bucket, lit by the sun
//! and by the point lights of illuminating tiles.
//!
//! # Invariants
//! - Renderer never mutates the tile store.
//! - Clip depth is `[0, 1]` with a `Less` depth test.
//! - All instance uploads of a rebuild go out in one queue submission.

mod device;
mod gpu;
mod shaders;

pub use device::WgpuInstanceDevice;
pub use gpu::WgpuRenderer;
