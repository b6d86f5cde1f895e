use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Per-instance record of a tile: world position plus one pad float.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct TileInstance {
    pub position: [f32; 3],
    pub reserved: f32,
}

impl TileInstance {
    pub fn new(position: Vec3) -> Self {
        Self {
            position: position.to_array(),
            reserved: 0.0,
        }
    }
}

/// Point light emitted by an illuminating tile.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct PointLight {
    pub position: [f32; 3],
    pub intensity: f32,
}

/// How a device buffer is bound by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRole {
    /// Per-instance vertex data.
    Instances,
    /// Read-only storage for the lighting pass.
    Lights,
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("out of memory allocating {bytes} bytes for {label}")]
    OutOfMemory { label: String, bytes: u64 },
    #[error("device error: {0}")]
    Other(String),
}

/// One staging-to-device copy.
pub struct BufferWrite<'a, B> {
    pub buffer: &'a B,
    pub bytes: &'a [u8],
}

/// GPU-side collaborator that owns instance and light buffers.
pub trait InstanceDevice {
    type Buffer;

    fn create_buffer(
        &mut self,
        role: BufferRole,
        bytes: u64,
        label: &str,
    ) -> Result<Self::Buffer, DeviceError>;

    fn release(&mut self, buffer: Self::Buffer);

    /// Copy every write in one batched submission.
    fn upload(&mut self, writes: &[BufferWrite<'_, Self::Buffer>]) -> Result<(), DeviceError>;
}

/// Growable device buffer with its host staging copy.
///
/// Capacity is a high-water mark: it grows to fit the largest count seen and
/// never shrinks until the bucket is released.
#[derive(Debug)]
pub(crate) struct Bucket<T, B> {
    buffer: Option<B>,
    capacity: usize,
    staging: Vec<T>,
}

impl<T, B> Default for Bucket<T, B> {
    fn default() -> Self {
        Self {
            buffer: None,
            capacity: 0,
            staging: Vec::new(),
        }
    }
}

impl<T: Pod, B> Bucket<T, B> {
    /// Allocate a replacement buffer when `required` exceeds the capacity.
    pub(crate) fn allocate_for<D: InstanceDevice<Buffer = B>>(
        &self,
        required: usize,
        role: BufferRole,
        label: &str,
        device: &mut D,
    ) -> Result<Option<B>, DeviceError> {
        if required <= self.capacity {
            return Ok(None);
        }
        let bytes = (required * std::mem::size_of::<T>()) as u64;
        tracing::debug!(label, from = self.capacity, to = required, "growing instance buffer");
        device.create_buffer(role, bytes, label).map(Some)
    }

    /// Swap in freshly built staging contents and, if one was allocated, the
    /// grown buffer. `staging` receives the previous contents for reuse.
    pub(crate) fn install<D: InstanceDevice<Buffer = B>>(
        &mut self,
        grown: Option<B>,
        staging: &mut Vec<T>,
        device: &mut D,
    ) {
        if let Some(buffer) = grown {
            if let Some(old) = self.buffer.replace(buffer) {
                device.release(old);
            }
            self.capacity = staging.len();
        }
        std::mem::swap(&mut self.staging, staging);
    }

    /// Pending copy for this bucket, if it holds anything.
    pub(crate) fn write(&self) -> Option<BufferWrite<'_, B>> {
        match &self.buffer {
            Some(buffer) if !self.staging.is_empty() => Some(BufferWrite {
                buffer,
                bytes: bytemuck::cast_slice(&self.staging),
            }),
            _ => None,
        }
    }

    pub(crate) fn release<D: InstanceDevice<Buffer = B>>(&mut self, device: &mut D) {
        if let Some(buffer) = self.buffer.take() {
            device.release(buffer);
        }
        self.capacity = 0;
        self.staging = Vec::new();
    }

    pub(crate) fn buffer(&self) -> Option<&B> {
        self.buffer.as_ref()
    }

    pub(crate) fn len(&self) -> usize {
        self.staging.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingDevice;
    use super::*;

    fn fill(n: usize) -> Vec<TileInstance> {
        (0..n)
            .map(|i| TileInstance::new(Vec3::new(i as f32, 0.0, 0.0)))
            .collect()
    }

    fn rebuild(bucket: &mut Bucket<TileInstance, u32>, device: &mut RecordingDevice, n: usize) {
        let mut staging = fill(n);
        let grown = bucket
            .allocate_for(n, BufferRole::Instances, "test", device)
            .unwrap();
        bucket.install(grown, &mut staging, device);
    }

    #[test]
    fn record_layouts_are_16_bytes() {
        assert_eq!(std::mem::size_of::<TileInstance>(), 16);
        assert_eq!(std::mem::size_of::<PointLight>(), 16);
    }

    #[test]
    fn capacity_grows_but_never_shrinks() {
        let mut device = RecordingDevice::default();
        let mut bucket = Bucket::default();

        rebuild(&mut bucket, &mut device, 10);
        assert!(bucket.capacity() >= 10);
        assert_eq!(bucket.len(), 10);
        assert_eq!(device.created.len(), 1);
        assert_eq!(device.created[0].2, 160);

        rebuild(&mut bucket, &mut device, 3);
        assert_eq!(bucket.capacity(), 10);
        assert_eq!(bucket.len(), 3);
        assert_eq!(device.created.len(), 1);

        rebuild(&mut bucket, &mut device, 12);
        assert_eq!(bucket.capacity(), 12);
        assert_eq!(device.created.len(), 2);
        assert_eq!(device.released, vec![1]);
    }

    #[test]
    fn empty_bucket_allocates_nothing() {
        let mut device = RecordingDevice::default();
        let mut bucket: Bucket<TileInstance, u32> = Bucket::default();
        rebuild(&mut bucket, &mut device, 0);
        assert!(bucket.buffer().is_none());
        assert!(bucket.write().is_none());
        assert!(device.created.is_empty());
    }

    #[test]
    fn write_covers_only_live_instances() {
        let mut device = RecordingDevice::default();
        let mut bucket = Bucket::default();
        rebuild(&mut bucket, &mut device, 8);
        rebuild(&mut bucket, &mut device, 2);
        let write = bucket.write().unwrap();
        assert_eq!(write.bytes.len(), 32);
        assert_eq!(*write.buffer, 1);
    }

    #[test]
    fn release_drops_buffer_and_capacity() {
        let mut device = RecordingDevice::default();
        let mut bucket = Bucket::default();
        rebuild(&mut bucket, &mut device, 4);
        bucket.release(&mut device);
        assert_eq!(bucket.capacity(), 0);
        assert_eq!(bucket.len(), 0);
        assert_eq!(device.live_buffers(), 0);
    }
}
