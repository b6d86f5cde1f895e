//! Matrix/Geometry Kernel: 4×4 transforms and projections for the camera.
//!
//! # Invariants
//! - Matrices are column-major and act on column vectors (`m * v`).
//! - Every builder produces a fresh matrix; nothing composes in place.
//! - Projections target the zero-to-one clip depth range used by wgpu.

pub mod matrix;

pub use matrix::{inverse, multiply, ortho, perspective, rotate, transform, translate, unproject};
