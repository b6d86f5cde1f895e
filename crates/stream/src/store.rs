use std::time::{Duration, Instant};

use tilescape_common::{CellCoord, CellRect, GroundRect, Model, TilePersistence, TileRecord};

use crate::instances::{
    Bucket, BufferRole, BufferWrite, DeviceError, InstanceDevice, PointLight, TileInstance,
};
use crate::window::WindowGrid;

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("persistence error: {0}")]
    Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("instance buffer allocation failed: {0}")]
    Allocation(#[source] DeviceError),
    #[error("instance buffer upload failed: {0}")]
    Upload(#[source] DeviceError),
}

impl StreamError {
    fn persistence<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
        Self::Persistence(Box::new(e))
    }
}

/// Outcome of one `TileStore::reconcile` call.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconcile {
    /// Window origin and size unchanged and no edit pending.
    Unchanged,
    Rebuilt(ReconcileStats),
}

/// Instrumentation for a window rebuild.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReconcileStats {
    pub window: CellRect,
    pub resized: bool,
    /// Persisted records that landed inside the window.
    pub records: usize,
    /// Instances across all model buckets.
    pub instances: usize,
    pub lights: usize,
    pub elapsed: Duration,
}

/// Camera-following window over persisted tiles plus the per-model instance
/// buffers built from it.
///
/// The window is a read-through cache: it is rebuilt wholesale whenever the
/// visible cell range changes or an edit marked it dirty, and is otherwise
/// left alone. A new store starts dirty so the first reconcile always loads.
pub struct TileStore<B> {
    tile_size: f32,
    grid: WindowGrid,
    dirty: bool,
    buckets: Vec<Bucket<TileInstance, B>>,
    lights: Bucket<PointLight, B>,
    scratch: Vec<Vec<TileInstance>>,
    light_scratch: Vec<PointLight>,
    last_stats: Option<ReconcileStats>,
}

impl<B> TileStore<B> {
    pub fn new(tile_size: f32) -> Self {
        assert!(tile_size > 0.0, "tile_size must be positive");
        Self {
            tile_size,
            grid: WindowGrid::new(),
            dirty: true,
            buckets: (0..Model::COUNT).map(|_| Bucket::default()).collect(),
            lights: Bucket::default(),
            scratch: vec![Vec::new(); Model::COUNT],
            light_scratch: Vec::new(),
            last_stats: None,
        }
    }

    /// Bring the window in line with the visible ground area.
    ///
    /// A no-op unless the cell range covering `bounds` differs from the
    /// current window or an edit is pending. Otherwise the window is cleared,
    /// reloaded from `persistence`, and every bucket is rebuilt and uploaded
    /// to `device` in one batch. On failure the previous buffers stay bound
    /// and the store stays dirty so the next call retries.
    pub fn reconcile<P, D>(
        &mut self,
        bounds: &GroundRect,
        persistence: &mut P,
        device: &mut D,
    ) -> Result<Reconcile, StreamError>
    where
        P: TilePersistence,
        D: InstanceDevice<Buffer = B>,
    {
        let target = bounds.to_cells(self.tile_size);
        if !self.dirty && target == self.grid.rect() {
            return Ok(Reconcile::Unchanged);
        }

        let _span = tracing::info_span!("tile_reconcile").entered();
        let started = Instant::now();
        self.dirty = true;

        let change = self.grid.reposition(target);
        if change.moved || change.resized {
            tracing::debug!(
                x = target.min.x,
                z = target.min.z,
                width = target.width(),
                height = target.height(),
                resized = change.resized,
                "window moved"
            );
        }

        let mut records = 0;
        let query = persistence
            .query_tiles(target)
            .map_err(StreamError::persistence)?;
        for record in query {
            if self.grid.set(record.cell, record.model) {
                records += 1;
            } else {
                tracing::trace!(x = record.cell.x, z = record.cell.z, "record outside window skipped");
            }
        }

        self.classify();
        self.flush(device)?;
        self.dirty = false;

        let stats = ReconcileStats {
            window: target,
            resized: change.resized,
            records,
            instances: self.grid.len(),
            lights: self.lights.len(),
            elapsed: started.elapsed(),
        };
        tracing::debug!(
            records,
            instances = stats.instances,
            lights = stats.lights,
            elapsed = ?stats.elapsed,
            "window rebuilt"
        );
        self.last_stats = Some(stats.clone());
        Ok(Reconcile::Rebuilt(stats))
    }

    /// Place `model` at `cell`, persist it and schedule a rebuild.
    ///
    /// Cells outside the window are still persisted; only the in-memory
    /// window ignores them.
    pub fn edit_model<P: TilePersistence>(
        &mut self,
        model: Model,
        cell: CellCoord,
        persistence: &mut P,
    ) -> Result<(), StreamError> {
        if !self.grid.set(cell, model) {
            tracing::warn!(x = cell.x, z = cell.z, "edit outside window, not cached");
        }
        self.dirty = true;
        persistence
            .upsert_tile(TileRecord { model, cell })
            .map_err(StreamError::persistence)
    }

    /// Model at `cell`, or `None` when the cell is outside the window.
    pub fn model_at(&self, cell: CellCoord) -> Option<Model> {
        self.grid.get(cell)
    }

    pub fn window(&self) -> CellRect {
        self.grid.rect()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// Device buffer and instance count of every non-empty model bucket.
    pub fn buckets(&self) -> impl Iterator<Item = (Model, &B, u32)> + '_ {
        Model::ALL.iter().zip(&self.buckets).filter_map(|(&model, bucket)| {
            let buffer = bucket.buffer()?;
            (bucket.len() > 0).then_some((model, buffer, bucket.len() as u32))
        })
    }

    /// Light buffer and light count, when any tile emits light.
    pub fn lights(&self) -> Option<(&B, u32)> {
        let buffer = self.lights.buffer()?;
        (self.lights.len() > 0).then_some((buffer, self.lights.len() as u32))
    }

    pub fn instance_count(&self, model: Model) -> usize {
        self.buckets[model.index()].len()
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    /// Allocated instance capacity of a model's buffer.
    pub fn capacity(&self, model: Model) -> usize {
        self.buckets[model.index()].capacity()
    }

    pub fn light_capacity(&self) -> usize {
        self.lights.capacity()
    }

    /// Stats of the most recent successful rebuild.
    pub fn last_stats(&self) -> Option<&ReconcileStats> {
        self.last_stats.as_ref()
    }

    /// Release every device buffer. The next reconcile reloads from scratch.
    pub fn release<D: InstanceDevice<Buffer = B>>(&mut self, device: &mut D) {
        for bucket in &mut self.buckets {
            bucket.release(device);
        }
        self.lights.release(device);
        self.dirty = true;
    }

    /// Sort window cells into per-model scratch lists, in window order.
    fn classify(&mut self) {
        for list in &mut self.scratch {
            list.clear();
        }
        self.light_scratch.clear();
        for (cell, model) in self.grid.iter() {
            let position = cell.to_world(self.tile_size);
            self.scratch[model.index()].push(TileInstance::new(position));
            if model.emits_light() {
                self.light_scratch.push(PointLight {
                    position: [position.x, model.height(), position.z],
                    intensity: model.illuminance(),
                });
            }
        }
    }

    /// Grow buffers as needed, swap in the scratch lists and upload.
    fn flush<D: InstanceDevice<Buffer = B>>(&mut self, device: &mut D) -> Result<(), StreamError> {
        // Allocate everything first so a failure leaves the old buffers intact.
        let mut grown = Vec::with_capacity(self.buckets.len());
        let allocated = self
            .buckets
            .iter()
            .zip(&self.scratch)
            .zip(Model::ALL)
            .try_for_each(|((bucket, list), model)| {
                let buffer =
                    bucket.allocate_for(list.len(), BufferRole::Instances, model.name(), device)?;
                grown.push(buffer);
                Ok::<(), DeviceError>(())
            })
            .and_then(|()| {
                self.lights
                    .allocate_for(self.light_scratch.len(), BufferRole::Lights, "lights", device)
            });
        let grown_lights = match allocated {
            Ok(buffer) => buffer,
            Err(e) => {
                for buffer in grown.into_iter().flatten() {
                    device.release(buffer);
                }
                tracing::error!(error = %e, "instance buffer allocation failed, keeping previous buffers");
                return Err(StreamError::Allocation(e));
            }
        };

        for ((bucket, list), buffer) in self.buckets.iter_mut().zip(&mut self.scratch).zip(grown) {
            bucket.install(buffer, list, device);
        }
        self.lights.install(grown_lights, &mut self.light_scratch, device);

        let writes: Vec<BufferWrite<'_, B>> = self
            .buckets
            .iter()
            .filter_map(Bucket::write)
            .chain(self.lights.write())
            .collect();
        if writes.is_empty() {
            return Ok(());
        }
        device.upload(&writes).map_err(|e| {
            tracing::error!(error = %e, "instance buffer upload failed");
            StreamError::Upload(e)
        })
    }
}
