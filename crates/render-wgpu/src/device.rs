use tilescape_stream::{BufferRole, BufferWrite, DeviceError, InstanceDevice};

/// `InstanceDevice` over a wgpu device and queue.
pub struct WgpuInstanceDevice<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
}

impl<'a> WgpuInstanceDevice<'a> {
    pub fn new(device: &'a wgpu::Device, queue: &'a wgpu::Queue) -> Self {
        Self { device, queue }
    }
}

impl InstanceDevice for WgpuInstanceDevice<'_> {
    type Buffer = wgpu::Buffer;

    fn create_buffer(
        &mut self,
        role: BufferRole,
        bytes: u64,
        label: &str,
    ) -> Result<wgpu::Buffer, DeviceError> {
        let usage = match role {
            BufferRole::Instances => wgpu::BufferUsages::VERTEX,
            BufferRole::Lights => wgpu::BufferUsages::STORAGE,
        } | wgpu::BufferUsages::COPY_DST;

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: bytes,
            usage,
            mapped_at_creation: false,
        });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            tracing::error!(%error, label, bytes, "buffer allocation failed");
            buffer.destroy();
            return Err(DeviceError::OutOfMemory {
                label: label.to_owned(),
                bytes,
            });
        }
        Ok(buffer)
    }

    fn release(&mut self, buffer: wgpu::Buffer) {
        buffer.destroy();
    }

    fn upload(&mut self, writes: &[BufferWrite<'_, wgpu::Buffer>]) -> Result<(), DeviceError> {
        for write in writes {
            self.queue.write_buffer(write.buffer, 0, write.bytes);
        }
        // Staged writes are flushed with the next submission.
        self.queue.submit(std::iter::empty());
        Ok(())
    }
}
