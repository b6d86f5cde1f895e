//! Streaming: a camera-following window over persisted tiles and the
//! per-model instance buffers rebuilt from it.
//!
//! # Invariants
//! - The window is reloaded only when its cell range changes or an edit is pending.
//! - Buffer capacity is a high-water mark and never shrinks.
//! - Instance counts never exceed capacity.
//! - A failed rebuild leaves the previous buffers bound.

mod instances;
mod store;
mod window;

pub use instances::{BufferRole, BufferWrite, DeviceError, InstanceDevice, PointLight, TileInstance};
pub use store::{Reconcile, ReconcileStats, StreamError, TileStore};
pub use window::{WindowChange, WindowGrid};
