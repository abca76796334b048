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


//! A host-memory backend for unit tests.

use ahash::AHashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use strata_core::{BackendCapabilities, BufferDescriptor, BufferId, ResourceBackend, ResourceError};

#[derive(Debug, Default)]
pub struct MockBackend {
    next_id: AtomicUsize,
    buffers: Mutex<AHashMap<BufferId, Vec<u8>>>,
    pub capabilities: BackendCapabilities,
    pub writes: AtomicUsize,
    pub copies: AtomicUsize,
    pub destroyed: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            capabilities: BackendCapabilities::default(),
            ..Default::default()
        }
    }

    pub fn with_capabilities(capabilities: BackendCapabilities) -> Self {
        Self {
            capabilities,
            ..Default::default()
        }
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.lock().len()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn copies(&self) -> usize {
        self.copies.load(Ordering::SeqCst)
    }
}

impl ResourceBackend for MockBackend {
    fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let id = BufferId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.buffers
            .lock()
            .insert(id, vec![0; descriptor.size as usize]);
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        self.buffers
            .lock()
            .remove(&id)
            .map(|_| ())
            .ok_or(ResourceError::InvalidHandle(id))
    }

    fn buffer_size(&self, id: BufferId) -> Result<u64, ResourceError> {
        self.buffers
            .lock()
            .get(&id)
            .map(|b| b.len() as u64)
            .ok_or(ResourceError::InvalidHandle(id))
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut buffers = self.buffers.lock();
        let buffer = buffers.get_mut(&id).ok_or(ResourceError::InvalidHandle(id))?;
        let start = offset as usize;
        let end = start + data.len();
        if end > buffer.len() {
            return Err(ResourceError::OutOfBounds {
                id,
                offset,
                size: data.len() as u64,
                capacity: buffer.len() as u64,
            });
        }
        buffer[start..end].copy_from_slice(data);
        Ok(())
    }

    fn read_buffer(&self, id: BufferId, offset: u64, size: u64) -> Result<Vec<u8>, ResourceError> {
        let buffers = self.buffers.lock();
        let buffer = buffers.get(&id).ok_or(ResourceError::InvalidHandle(id))?;
        let start = offset as usize;
        let end = start + size as usize;
        buffer
            .get(start..end)
            .map(<[u8]>::to_vec)
            .ok_or(ResourceError::OutOfBounds {
                id,
                offset,
                size,
                capacity: buffer.len() as u64,
            })
    }

    fn copy_buffer_to_buffer(
        &self,
        source: BufferId,
        source_offset: u64,
        destination: BufferId,
        destination_offset: u64,
        size: u64,
    ) -> Result<(), ResourceError> {
        self.copies.fetch_add(1, Ordering::SeqCst);
        let bytes = self.read_buffer(source, source_offset, size)?;
        let mut buffers = self.buffers.lock();
        let buffer = buffers
            .get_mut(&destination)
            .ok_or(ResourceError::InvalidHandle(destination))?;
        let capacity = buffer.len() as u64;
        let start = destination_offset as usize;
        buffer
            .get_mut(start..start + bytes.len())
            .ok_or(ResourceError::OutOfBounds {
                id: destination,
                offset: destination_offset,
                size,
                capacity,
            })?
            .copy_from_slice(&bytes);
        Ok(())
    }
}
