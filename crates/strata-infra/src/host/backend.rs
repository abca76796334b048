// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use strata_core::{
    BackendCapabilities, BufferDescriptor, BufferId, BufferUsage, ResourceBackend, ResourceError,
};

#[derive(Debug)]
struct HostBufferEntry {
    data: Vec<u8>,
    label: Option<String>,
    usage: BufferUsage,
}

/// Operation counts of a [`HostBackend`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostBackendStats {
    /// Buffers currently alive.
    pub live_buffers: usize,
    /// Bytes currently allocated.
    pub allocated_bytes: u64,
    /// Highest value `allocated_bytes` has reached.
    pub peak_bytes: u64,
    /// Buffers created.
    pub buffers_created: u64,
    /// Buffers destroyed.
    pub buffers_destroyed: u64,
    /// Host-to-device writes.
    pub writes: u64,
    /// Device-to-host reads.
    pub reads: u64,
    /// Device-to-device copies.
    pub copies: u64,
}

#[derive(Debug)]
struct HostBackendInternal {
    capabilities: BackendCapabilities,
    buffers: Mutex<HashMap<BufferId, HostBufferEntry>>,
    next_buffer_id: AtomicUsize,
    allocated_bytes: AtomicU64,
    peak_bytes: AtomicU64,
    buffers_created: AtomicU64,
    buffers_destroyed: AtomicU64,
    writes: AtomicU64,
    reads: AtomicU64,
    copies: AtomicU64,
}

/// A clonable, thread-safe backend whose buffers are plain byte vectors.
#[derive(Clone, Debug)]
pub struct HostBackend {
    internal: Arc<HostBackendInternal>,
}

impl HostBackend {
    /// Creates a backend with default capabilities.
    pub fn new() -> Self {
        Self::with_capabilities(BackendCapabilities::default())
    }

    /// Creates a backend reporting `capabilities`.
    pub fn with_capabilities(capabilities: BackendCapabilities) -> Self {
        Self {
            internal: Arc::new(HostBackendInternal {
                capabilities,
                buffers: Mutex::new(HashMap::new()),
                next_buffer_id: AtomicUsize::new(0),
                allocated_bytes: AtomicU64::new(0),
                peak_bytes: AtomicU64::new(0),
                buffers_created: AtomicU64::new(0),
                buffers_destroyed: AtomicU64::new(0),
                writes: AtomicU64::new(0),
                reads: AtomicU64::new(0),
                copies: AtomicU64::new(0),
            }),
        }
    }

    fn generate_buffer_id(&self) -> BufferId {
        BufferId(
            self.internal
                .next_buffer_id
                .fetch_add(1, Ordering::Relaxed),
        )
    }

    /// Returns a snapshot of the operation counters.
    pub fn stats(&self) -> HostBackendStats {
        let internal = &self.internal;
        HostBackendStats {
            live_buffers: internal.buffers.lock().len(),
            allocated_bytes: internal.allocated_bytes.load(Ordering::Relaxed),
            peak_bytes: internal.peak_bytes.load(Ordering::Relaxed),
            buffers_created: internal.buffers_created.load(Ordering::Relaxed),
            buffers_destroyed: internal.buffers_destroyed.load(Ordering::Relaxed),
            writes: internal.writes.load(Ordering::Relaxed),
            reads: internal.reads.load(Ordering::Relaxed),
            copies: internal.copies.load(Ordering::Relaxed),
        }
    }

    /// Debug label a buffer was created with.
    pub fn buffer_label(&self, id: BufferId) -> Option<String> {
        self.internal
            .buffers
            .lock()
            .get(&id)
            .and_then(|entry| entry.label.clone())
    }

    /// Usage flags a buffer was created with.
    pub fn buffer_usage(&self, id: BufferId) -> Option<BufferUsage> {
        self.internal.buffers.lock().get(&id).map(|entry| entry.usage)
    }
}

impl Default for HostBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn check_bounds(id: BufferId, offset: u64, size: u64, capacity: usize) -> Result<std::ops::Range<usize>, ResourceError> {
    let end = offset.checked_add(size);
    match end {
        Some(end) if end <= capacity as u64 => Ok(offset as usize..end as usize),
        _ => Err(ResourceError::OutOfBounds {
            id,
            offset,
            size,
            capacity: capacity as u64,
        }),
    }
}

impl ResourceBackend for HostBackend {
    fn capabilities(&self) -> BackendCapabilities {
        self.internal.capabilities
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let size = usize::try_from(descriptor.size)
            .map_err(|_| ResourceError::BackendError(format!("buffer size {} too large", descriptor.size)))?;
        let id = self.generate_buffer_id();

        let allocated = self
            .internal
            .allocated_bytes
            .fetch_add(descriptor.size, Ordering::Relaxed)
            + descriptor.size;
        self.internal
            .peak_bytes
            .fetch_max(allocated, Ordering::Relaxed);
        self.internal
            .buffers_created
            .fetch_add(1, Ordering::Relaxed);

        self.internal.buffers.lock().insert(
            id,
            HostBufferEntry {
                data: vec![0; size],
                label: descriptor.label.as_ref().map(|label| label.to_string()),
                usage: descriptor.usage,
            },
        );

        log::trace!(
            "HostBackend: Created buffer '{}' with ID: {id:?}, size: {} bytes",
            descriptor.label.as_deref().unwrap_or("unlabeled"),
            descriptor.size
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let mut buffers = self.internal.buffers.lock();
        if let Some(entry) = buffers.remove(&id) {
            self.internal
                .allocated_bytes
                .fetch_sub(entry.data.len() as u64, Ordering::Relaxed);
            self.internal
                .buffers_destroyed
                .fetch_add(1, Ordering::Relaxed);
            log::trace!("HostBackend: Destroyed buffer with ID: {id:?}");
            Ok(())
        } else {
            Err(ResourceError::InvalidHandle(id))
        }
    }

    fn buffer_size(&self, id: BufferId) -> Result<u64, ResourceError> {
        self.internal
            .buffers
            .lock()
            .get(&id)
            .map(|entry| entry.data.len() as u64)
            .ok_or(ResourceError::InvalidHandle(id))
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let mut buffers = self.internal.buffers.lock();
        let entry = buffers.get_mut(&id).ok_or(ResourceError::InvalidHandle(id))?;
        let range = check_bounds(id, offset, data.len() as u64, entry.data.len())?;
        entry.data[range].copy_from_slice(data);
        self.internal.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn read_buffer(&self, id: BufferId, offset: u64, size: u64) -> Result<Vec<u8>, ResourceError> {
        let buffers = self.internal.buffers.lock();
        let entry = buffers.get(&id).ok_or(ResourceError::InvalidHandle(id))?;
        let range = check_bounds(id, offset, size, entry.data.len())?;
        self.internal.reads.fetch_add(1, Ordering::Relaxed);
        Ok(entry.data[range].to_vec())
    }

    fn copy_buffer_to_buffer(
        &self,
        source: BufferId,
        source_offset: u64,
        destination: BufferId,
        destination_offset: u64,
        size: u64,
    ) -> Result<(), ResourceError> {
        let mut buffers = self.internal.buffers.lock();
        let bytes = {
            let entry = buffers
                .get(&source)
                .ok_or(ResourceError::InvalidHandle(source))?;
            let range = check_bounds(source, source_offset, size, entry.data.len())?;
            entry.data[range].to_vec()
        };
        let entry = buffers
            .get_mut(&destination)
            .ok_or(ResourceError::InvalidHandle(destination))?;
        let range = check_bounds(destination, destination_offset, size, entry.data.len())?;
        entry.data[range].copy_from_slice(&bytes);
        self.internal.copies.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    fn descriptor(size: u64) -> BufferDescriptor<'static> {
        BufferDescriptor {
            label: Some(Cow::Borrowed("test")),
            size,
            usage: BufferUsage::STORAGE | BufferUsage::COPY_DST,
            mapped_at_creation: false,
        }
    }

    #[test]
    fn test_create_write_read() {
        let backend = HostBackend::new();
        let id = backend.create_buffer(&descriptor(16)).unwrap();
        backend.write_buffer(id, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(backend.read_buffer(id, 0, 8).unwrap(), vec![0, 0, 0, 0, 1, 2, 3, 4]);
        assert_eq!(backend.buffer_label(id).as_deref(), Some("test"));
        assert_eq!(backend.buffer_size(id).unwrap(), 16);
    }

    #[test]
    fn test_out_of_bounds_is_rejected() {
        let backend = HostBackend::new();
        let id = backend.create_buffer(&descriptor(8)).unwrap();
        let err = backend.write_buffer(id, 6, &[0; 4]).unwrap_err();
        assert_eq!(
            err,
            ResourceError::OutOfBounds {
                id,
                offset: 6,
                size: 4,
                capacity: 8
            }
        );
        assert!(backend.read_buffer(id, u64::MAX, 2).is_err());
    }

    #[test]
    fn test_memory_accounting() {
        let backend = HostBackend::new();
        let a = backend.create_buffer(&descriptor(64)).unwrap();
        let b = backend.create_buffer(&descriptor(32)).unwrap();
        backend.destroy_buffer(a).unwrap();

        let stats = backend.stats();
        assert_eq!(stats.live_buffers, 1);
        assert_eq!(stats.allocated_bytes, 32);
        assert_eq!(stats.peak_bytes, 96);
        assert_eq!(stats.buffers_destroyed, 1);
        assert_eq!(backend.destroy_buffer(a), Err(ResourceError::InvalidHandle(a)));
        backend.destroy_buffer(b).unwrap();
    }

    #[test]
    fn test_copy_between_buffers() {
        let backend = HostBackend::new();
        let src = backend.create_buffer(&descriptor(8)).unwrap();
        let dst = backend.create_buffer(&descriptor(8)).unwrap();
        backend.write_buffer(src, 0, &[9; 8]).unwrap();
        backend.copy_buffer_to_buffer(src, 2, dst, 4, 4).unwrap();
        assert_eq!(backend.read_buffer(dst, 0, 8).unwrap(), vec![0, 0, 0, 0, 9, 9, 9, 9]);
        assert_eq!(backend.stats().copies, 1);
    }
}
