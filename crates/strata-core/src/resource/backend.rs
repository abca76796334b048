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

//! The render-backend boundary.
//!
//! Aggregation code decides buffer sizes, layouts, and which bytes move where;
//! the actual allocate/copy/free calls are delegated to a [`ResourceBackend`].

use super::buffer::{BufferDescriptor, BufferId};
use super::error::ResourceError;
use std::fmt::Debug;

/// Device limits relevant to buffer aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendCapabilities {
    /// Required alignment of uniform-block binding offsets, in bytes.
    pub uniform_buffer_offset_alignment: u64,
    /// Largest uniform block that can be bound, in bytes.
    pub max_uniform_block_size: u64,
    /// Largest storage block that can be bound, in bytes.
    pub max_storage_block_size: u64,
}

impl Default for BackendCapabilities {
    fn default() -> Self {
        Self {
            uniform_buffer_offset_alignment: 256,
            max_uniform_block_size: 64 * 1024,
            max_storage_block_size: 128 * 1024 * 1024,
        }
    }
}

/// Device buffer operations used by the aggregation layer.
///
/// Implementations must be thread-safe; the aggregation layer only calls
/// them from the sync thread but producers may hold the backend across
/// worker threads.
pub trait ResourceBackend: Send + Sync + Debug + 'static {
    /// Returns the device limits.
    fn capabilities(&self) -> BackendCapabilities;

    /// Creates a new, zero-initialised device buffer.
    /// ## Errors
    /// * `ResourceError` - If the buffer could not be created.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError>;

    /// Destroys a device buffer.
    /// ## Errors
    /// * `ResourceError::InvalidHandle` - If the buffer does not exist.
    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Returns the size of a buffer in bytes.
    fn buffer_size(&self, id: BufferId) -> Result<u64, ResourceError>;

    /// Writes host data into a buffer at `offset`.
    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError>;

    /// Reads `size` bytes from a buffer at `offset` back to the host.
    fn read_buffer(&self, id: BufferId, offset: u64, size: u64) -> Result<Vec<u8>, ResourceError>;

    /// Copies `size` bytes between two device buffers.
    fn copy_buffer_to_buffer(
        &self,
        source: BufferId,
        source_offset: u64,
        destination: BufferId,
        destination_offset: u64,
        size: u64,
    ) -> Result<(), ResourceError>;

    /// Submits any recorded work. Backends that execute eagerly may ignore this.
    fn flush(&self) -> Result<(), ResourceError> {
        Ok(())
    }
}
