//! File-backed tile persistence.
//!
//! Layout inside the database directory:
//! ```text
//! tiles.meta.json              - metadata and schema version
//! snapshots/
//!   000001.tiles.cbor.zst      - CBOR+zstd compressed full tile maps
//! journal/
//!   000001.log.cbor.zst        - CBOR+zstd compressed edit segments
//! integrity/
//!   manifest.json              - hash chain manifest
//! ```

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tilescape_common::{CellCoord, CellRect, Model, SavedPosition, TilePersistence, TileRecord};

use crate::memory::{apply_upsert, records_in};

/// Current schema version of snapshots and journal segments.
const TILES_SCHEMA_VERSION: u32 = 1;

const META_FILE: &str = "tiles.meta.json";
const SNAPSHOT_DIR: &str = "snapshots";
const JOURNAL_DIR: &str = "journal";

/// Errors from file-backed persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CBOR serialization error: {0}")]
    CborEncode(String),
    #[error("CBOR deserialization error: {0}")]
    CborDecode(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },
    #[error("segment {filename} has no manifest entry")]
    UnlistedSegment { filename: String },
    #[error("schema version mismatch: file has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: u32,
        expected_version: u32,
    },
}

/// Metadata stored in tiles.meta.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TilesMeta {
    pub schema_version: u32,
    pub snapshot_count: u32,
    pub journal_count: u32,
}

/// A single entry in the integrity manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
    pub sha256: String,
    pub prev_hash: Option<String>,
}

/// Integrity manifest tracking all segment hashes in a chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrityManifest {
    pub entries: Vec<ManifestEntry>,
}

/// One journaled change. Models are stored by catalog id.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TileEvent {
    TilePlaced { x: i32, z: i32, model: u8 },
    PositionSaved { model: u8, x: f32, z: f32 },
}

/// Full tile map at a point in the journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TileSnapshot {
    /// Number of journal segments folded into this snapshot.
    journal_seq: u32,
    position: (u8, f32, f32),
    tiles: Vec<(i32, i32, u8)>,
}

/// File-backed tile database with schema versioning and integrity checking.
///
/// Edits are applied in memory immediately and buffered; `commit` writes the
/// buffer as one journal segment. Dropping the database commits whatever is
/// still pending.
pub struct TileDatabase {
    root: PathBuf,
    meta: TilesMeta,
    manifest: IntegrityManifest,
    tiles: BTreeMap<CellCoord, Model>,
    position: SavedPosition,
    pending: Vec<TileEvent>,
}

impl TileDatabase {
    /// Open or create a tile database at the given path, replaying its contents.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join(SNAPSHOT_DIR))?;
        std::fs::create_dir_all(root.join(JOURNAL_DIR))?;
        std::fs::create_dir_all(root.join("integrity"))?;

        let meta_path = root.join(META_FILE);
        let manifest_path = root.join("integrity").join("manifest.json");

        let (meta, manifest) = if meta_path.exists() {
            let meta: TilesMeta = serde_json::from_reader(std::fs::File::open(&meta_path)?)?;
            if meta.schema_version != TILES_SCHEMA_VERSION {
                return Err(StoreError::SchemaMismatch {
                    file_version: meta.schema_version,
                    expected_version: TILES_SCHEMA_VERSION,
                });
            }
            let manifest: IntegrityManifest = if manifest_path.exists() {
                serde_json::from_reader(std::fs::File::open(&manifest_path)?)?
            } else {
                IntegrityManifest::default()
            };
            (meta, manifest)
        } else {
            let meta = TilesMeta {
                schema_version: TILES_SCHEMA_VERSION,
                snapshot_count: 0,
                journal_count: 0,
            };
            let manifest = IntegrityManifest::default();
            serde_json::to_writer_pretty(std::fs::File::create(&meta_path)?, &meta)?;
            serde_json::to_writer_pretty(std::fs::File::create(&manifest_path)?, &manifest)?;
            (meta, manifest)
        };

        let mut db = Self {
            root,
            meta,
            manifest,
            tiles: BTreeMap::new(),
            position: SavedPosition::default(),
            pending: Vec::new(),
        };
        db.replay()?;
        tracing::info!(
            root = %db.root.display(),
            tiles = db.tiles.len(),
            snapshots = db.meta.snapshot_count,
            journal = db.meta.journal_count,
            "tile database opened"
        );
        Ok(db)
    }

    /// Write all pending edits as one journal segment. Returns the number of
    /// events written.
    pub fn commit(&mut self) -> Result<usize, StoreError> {
        if self.pending.is_empty() {
            return Ok(0);
        }
        let _span = tracing::info_span!("tiles_commit", events = self.pending.len()).entered();
        let filename = format!("{:06}.log.cbor.zst", self.meta.journal_count + 1);
        let events = std::mem::take(&mut self.pending);
        if let Err(e) = self.write_segment(JOURNAL_DIR, &filename, &events) {
            self.pending = events;
            return Err(e);
        }
        self.meta.journal_count += 1;
        self.save_meta()?;
        self.save_manifest()?;
        let written = events.len();
        tracing::debug!(written, "journal segment written");
        Ok(written)
    }

    /// Commit pending edits, then write a snapshot folding the whole journal.
    pub fn compact(&mut self) -> Result<(), StoreError> {
        self.commit()?;
        let _span = tracing::info_span!("tiles_compact", tiles = self.tiles.len()).entered();
        let snapshot = TileSnapshot {
            journal_seq: self.meta.journal_count,
            position: (self.position.model.id(), self.position.x, self.position.z),
            tiles: self
                .tiles
                .iter()
                .map(|(cell, model)| (cell.x, cell.z, model.id()))
                .collect(),
        };
        let filename = format!("{:06}.tiles.cbor.zst", self.meta.snapshot_count + 1);
        self.write_segment(SNAPSHOT_DIR, &filename, &snapshot)?;
        self.meta.snapshot_count += 1;
        self.save_meta()?;
        self.save_manifest()?;
        Ok(())
    }

    /// Verify all integrity hashes in the manifest.
    pub fn verify_integrity(&self) -> Result<(), StoreError> {
        let mut prev_hash: Option<String> = None;
        for entry in &self.manifest.entries {
            if entry.prev_hash != prev_hash {
                return Err(StoreError::IntegrityMismatch {
                    expected: prev_hash.unwrap_or_else(|| "None".into()),
                    actual: entry.prev_hash.clone().unwrap_or_else(|| "None".into()),
                });
            }

            let data = std::fs::read(self.segment_path(&entry.filename))?;
            let actual_hash = sha256_hex(&data);
            if actual_hash != entry.sha256 {
                return Err(StoreError::IntegrityMismatch {
                    expected: entry.sha256.clone(),
                    actual: actual_hash,
                });
            }

            prev_hash = Some(entry.sha256.clone());
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn meta(&self) -> &TilesMeta {
        &self.meta
    }

    pub fn manifest(&self) -> &IntegrityManifest {
        &self.manifest
    }

    /// Number of non-default tiles stored.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Events applied in memory but not yet written to the journal.
    pub fn pending(&self) -> &[TileEvent] {
        &self.pending
    }

    fn replay(&mut self) -> Result<(), StoreError> {
        let mut first_segment = 1;
        if self.meta.snapshot_count > 0 {
            let filename = format!("{:06}.tiles.cbor.zst", self.meta.snapshot_count);
            let snapshot: TileSnapshot = self.read_segment(SNAPSHOT_DIR, &filename)?;
            for (x, z, id) in snapshot.tiles {
                self.apply(TileEvent::TilePlaced { x, z, model: id });
            }
            let (model, x, z) = snapshot.position;
            self.apply(TileEvent::PositionSaved { model, x, z });
            first_segment = snapshot.journal_seq + 1;
        }
        for index in first_segment..=self.meta.journal_count {
            let filename = format!("{:06}.log.cbor.zst", index);
            let events: Vec<TileEvent> = self.read_segment(JOURNAL_DIR, &filename)?;
            for event in events {
                self.apply(event);
            }
        }
        Ok(())
    }

    fn apply(&mut self, event: TileEvent) {
        match event {
            TileEvent::TilePlaced { x, z, model } => match Model::from_id(model) {
                Some(model) => apply_upsert(&mut self.tiles, TileRecord::new(model, x, z)),
                None => tracing::warn!(x, z, model, "skipping tile with unknown model id"),
            },
            TileEvent::PositionSaved { model, x, z } => {
                let model = Model::from_id(model).unwrap_or_else(|| {
                    tracing::warn!(model, "unknown saved model id, using default");
                    Model::default()
                });
                self.position = SavedPosition { model, x, z };
            }
        }
    }

    fn segment_path(&self, filename: &str) -> PathBuf {
        if filename.ends_with(".tiles.cbor.zst") {
            self.root.join(SNAPSHOT_DIR).join(filename)
        } else {
            self.root.join(JOURNAL_DIR).join(filename)
        }
    }

    fn write_segment<T: Serialize + ?Sized>(
        &mut self,
        dir: &str,
        filename: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        let compressed = zstd_compress(&cbor_serialize(value)?)?;
        let hash = sha256_hex(&compressed);
        let prev_hash = self.manifest.entries.last().map(|e| e.sha256.clone());

        std::fs::write(self.root.join(dir).join(filename), &compressed)?;

        self.manifest.entries.push(ManifestEntry {
            filename: filename.to_owned(),
            sha256: hash,
            prev_hash,
        });
        Ok(())
    }

    fn read_segment<T: for<'de> Deserialize<'de>>(
        &self,
        dir: &str,
        filename: &str,
    ) -> Result<T, StoreError> {
        let compressed = std::fs::read(self.root.join(dir).join(filename))?;
        self.verify_file_hash(filename, &compressed)?;
        cbor_deserialize(&zstd_decompress(&compressed)?)
    }

    fn verify_file_hash(&self, filename: &str, data: &[u8]) -> Result<(), StoreError> {
        let actual = sha256_hex(data);
        match self.manifest.entries.iter().find(|e| e.filename == filename) {
            Some(entry) if entry.sha256 != actual => Err(StoreError::IntegrityMismatch {
                expected: entry.sha256.clone(),
                actual,
            }),
            Some(_) => Ok(()),
            None => Err(StoreError::UnlistedSegment {
                filename: filename.to_owned(),
            }),
        }
    }

    fn save_meta(&self) -> Result<(), StoreError> {
        let path = self.root.join(META_FILE);
        serde_json::to_writer_pretty(std::fs::File::create(path)?, &self.meta)?;
        Ok(())
    }

    fn save_manifest(&self) -> Result<(), StoreError> {
        let path = self.root.join("integrity").join("manifest.json");
        serde_json::to_writer_pretty(std::fs::File::create(path)?, &self.manifest)?;
        Ok(())
    }
}

impl TilePersistence for TileDatabase {
    type Error = StoreError;

    fn query_tiles(
        &mut self,
        area: CellRect,
    ) -> Result<Box<dyn Iterator<Item = TileRecord> + '_>, Self::Error> {
        Ok(records_in(&self.tiles, area))
    }

    fn upsert_tile(&mut self, record: TileRecord) -> Result<(), Self::Error> {
        apply_upsert(&mut self.tiles, record);
        self.pending.push(TileEvent::TilePlaced {
            x: record.cell.x,
            z: record.cell.z,
            model: record.model.id(),
        });
        Ok(())
    }

    fn saved_position(&self) -> SavedPosition {
        self.position
    }

    fn set_saved_position(&mut self, position: SavedPosition) -> Result<(), Self::Error> {
        if position == self.position {
            return Ok(());
        }
        self.position = position;
        let event = TileEvent::PositionSaved {
            model: position.model.id(),
            x: position.x,
            z: position.z,
        };
        // Only the latest position matters; collapse consecutive saves.
        match self.pending.last_mut() {
            Some(last) if matches!(last, TileEvent::PositionSaved { .. }) => *last = event,
            _ => self.pending.push(event),
        }
        Ok(())
    }
}

impl Drop for TileDatabase {
    fn drop(&mut self) {
        if let Err(e) = self.commit() {
            tracing::error!(error = %e, "failed to commit pending tile edits");
        }
    }
}

fn cbor_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| StoreError::CborEncode(e.to_string()))?;
    Ok(buf)
}

fn cbor_deserialize<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, StoreError> {
    ciborium::from_reader(data).map_err(|e| StoreError::CborDecode(e.to_string()))
}

fn zstd_compress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut encoder = zstd::Encoder::new(Vec::new(), 3)?;
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn zstd_decompress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut decoder = zstd::Decoder::new(data)?;
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf)?;
    Ok(buf)
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
