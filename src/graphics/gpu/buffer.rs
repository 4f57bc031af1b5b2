use std::sync::{Mutex, MutexGuard, PoisonError};

use slotmap::{SlotMap, new_key_type};
use thiserror::Error;
use wgpu::{BufferUsages, util::{BufferInitDescriptor, DeviceExt}};

use crate::graphics::gpu::GpuContext;

new_key_type! {
    /// Opaque reference to a buffer owned by a `BufferStore`.
    pub struct BufferHandle;
}

/// A wgpu buffer.
#[derive(Clone, Debug)]
pub struct GpuBuffer {
    buffer: wgpu::Buffer,
}

impl GpuBuffer {
    /// Create a buffer initialized with `contents`.
    pub fn create(label: &str, gpu: &GpuContext, contents: &[u8], usage: BufferUsages) -> Self {
        let buffer = gpu.device().create_buffer_init(&BufferInitDescriptor {
            label: Some(label),
            contents,
            usage,
        });
        Self { buffer }
    }

    /// Get the actual buffer.
    pub fn handle(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

/// Where the bytes of a registered buffer actually live.
pub trait BufferBackend: Send + Sync {
    type Buffer: Send;

    fn create(&self, label: &str, contents: &[u8], usage: BufferUsages) -> Self::Buffer;

    /// Overwrite the start of `buffer` with `contents`.
    fn write(&self, buffer: &mut Self::Buffer, contents: &[u8]);

    fn destroy(&self, buffer: Self::Buffer);
}

/// Keeps buffer contents in host memory. Used for headless runs and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostMemory;

impl BufferBackend for HostMemory {
    type Buffer = Vec<u8>;

    fn create(&self, _label: &str, contents: &[u8], _usage: BufferUsages) -> Vec<u8> {
        contents.to_vec()
    }

    fn write(&self, buffer: &mut Vec<u8>, contents: &[u8]) {
        buffer[..contents.len()].copy_from_slice(contents);
    }

    fn destroy(&self, _buffer: Vec<u8>) {}
}

/// Bookkeeping for a registered buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct BufferInfo {
    pub label: String,
    pub stride: u32,
    pub count: u32,
    pub usage: BufferUsages,
}

impl BufferInfo {
    /// Size of the buffer in bytes.
    pub fn byte_size(&self) -> u64 {
        self.stride as u64 * self.count as u64
    }
}

/// The buffer-creation collaborator shared by every model load.
///
/// Implementations must be safe to call from concurrent loads.
pub trait BufferStore: Send + Sync {
    /// Create a buffer of `count` elements of `stride` bytes each.
    fn create_buffer(
        &self,
        data: &[u8],
        stride: u32,
        count: u32,
        usage: BufferUsages,
        label: &str,
    ) -> Result<BufferHandle, BufferError>;

    fn destroy_buffer(&self, handle: BufferHandle) -> Result<(), BufferError>;

    /// Overwrite the start of the buffer with `data`.
    fn update_buffer(&self, handle: BufferHandle, data: &[u8]) -> Result<(), BufferError>;
}

struct StoredBuffer<T> {
    info: BufferInfo,
    buffer: T,
}

/// Owns every buffer created through it, handing out `BufferHandle`s.
///
/// A single lock guards the buffer table, held only for the duration of one call.
pub struct BufferRegistry<B: BufferBackend> {
    backend: B,
    buffers: Mutex<SlotMap<BufferHandle, StoredBuffer<B::Buffer>>>,
}

impl<B: BufferBackend> BufferRegistry<B> {
    /// Create an empty registry on top of `backend`.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            buffers: Mutex::new(SlotMap::with_key()),
        }
    }

    /// Number of live buffers.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the bookkeeping for a buffer, if it exists.
    pub fn info(&self, handle: BufferHandle) -> Option<BufferInfo> {
        self.lock().get(handle).map(|stored| stored.info.clone())
    }

    fn lock(&self) -> MutexGuard<'_, SlotMap<BufferHandle, StoredBuffer<B::Buffer>>> {
        self.buffers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BufferRegistry<HostMemory> {
    /// Copy out the current bytes of a host buffer.
    pub fn contents(&self, handle: BufferHandle) -> Option<Vec<u8>> {
        self.lock().get(handle).map(|stored| stored.buffer.clone())
    }
}

impl<B: BufferBackend> BufferStore for BufferRegistry<B> {
    fn create_buffer(
        &self,
        data: &[u8],
        stride: u32,
        count: u32,
        usage: BufferUsages,
        label: &str,
    ) -> Result<BufferHandle, BufferError> {
        let info = BufferInfo {
            label: label.to_string(),
            stride,
            count,
            usage,
        };
        let expected = info.byte_size();
        if expected != data.len() as u64 {
            return Err(BufferError::DataSizeMismatch {
                label: info.label,
                expected,
                actual: data.len(),
            });
        }

        let mut buffers = self.lock();
        let buffer = self.backend.create(label, data, usage);
        Ok(buffers.insert(StoredBuffer { info, buffer }))
    }

    fn destroy_buffer(&self, handle: BufferHandle) -> Result<(), BufferError> {
        let mut buffers = self.lock();
        let stored = buffers
            .remove(handle)
            .ok_or(BufferError::BufferNotFound(handle))?;
        self.backend.destroy(stored.buffer);
        Ok(())
    }

    fn update_buffer(&self, handle: BufferHandle, data: &[u8]) -> Result<(), BufferError> {
        let mut buffers = self.lock();
        let stored = buffers
            .get_mut(handle)
            .ok_or(BufferError::BufferNotFound(handle))?;
        if data.len() as u64 > stored.info.byte_size() {
            return Err(BufferError::UpdateTooLarge {
                label: stored.info.label.clone(),
                capacity: stored.info.byte_size(),
                actual: data.len(),
            });
        }
        self.backend.write(&mut stored.buffer, data);
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("Buffer \"{label}\" expects {expected} bytes but was given {actual}")]
    DataSizeMismatch {
        label: String,
        expected: u64,
        actual: usize,
    },
    #[error("Update of {actual} bytes doesn't fit in buffer \"{label}\" ({capacity} bytes)")]
    UpdateTooLarge {
        label: String,
        capacity: u64,
        actual: usize,
    },
    #[error("Couldn't find buffer of handle {0:?}")]
    BufferNotFound(BufferHandle),
}
