pub mod blas;
pub mod buffer;

use wgpu::{
    Backends, DeviceDescriptor, ExperimentalFeatures, Features, Instance, InstanceDescriptor,
    Limits, PowerPreference, RequestAdapterOptions, Trace,
};

use crate::graphics::gpu::buffer::{BufferBackend, GpuBuffer};

/// Abstraction over GPU-related data.
#[derive(Clone, Debug)]
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl GpuContext {
    /// Instantiate.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }

    /// Get a device and queue without a surface.
    pub async fn headless() -> anyhow::Result<Self> {
        let instance = Instance::new(&InstanceDescriptor {
            backends: Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;
        log::info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: None,
                required_features: Features::empty(),
                experimental_features: ExperimentalFeatures::disabled(),
                required_limits: Limits::default(),
                memory_hints: Default::default(),
                trace: Trace::Off,
            })
            .await?;

        Ok(Self::new(device, queue))
    }

    /// Get the device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Get the queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

/// Buffers created through a `GpuContext` live in device memory.
impl BufferBackend for GpuContext {
    type Buffer = GpuBuffer;

    fn create(&self, label: &str, contents: &[u8], usage: wgpu::BufferUsages) -> GpuBuffer {
        GpuBuffer::create(label, self, contents, usage)
    }

    fn write(&self, buffer: &mut GpuBuffer, contents: &[u8]) {
        self.queue.write_buffer(buffer.handle(), 0, contents);
    }

    fn destroy(&self, buffer: GpuBuffer) {
        buffer.handle().destroy();
    }
}
