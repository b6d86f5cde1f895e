//! Tile persistence: a file-backed snapshot + journal database and an
//! in-memory store, both implementing `TilePersistence`.
//!
//! # Invariants
//! - The journal is append-only; every segment is chained in the integrity manifest.
//! - Opening replays the latest snapshot plus every later journal segment.
//! - Erasing a cell (writing the default model) removes its record.

mod memory;
mod store;

pub use memory::MemoryTiles;
pub use store::{IntegrityManifest, ManifestEntry, StoreError, TileDatabase, TileEvent, TilesMeta};
