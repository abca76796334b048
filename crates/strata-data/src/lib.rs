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


//! # Strata Data
//!
//! The stateful half of scene synchronisation: dirty-bit tracking, the
//! per-collection dirty lists, content-addressed instance caches, mesh
//! topology, and the striped interleaved buffer allocator.

#![warn(missing_docs)]

pub mod buffer;
pub mod change_tracker;
pub mod dirty_list;
pub mod instance_registry;
pub mod mesh;

#[cfg(test)]
pub(crate) mod test_support;

pub use buffer::{
    BufferArrayRegistry, InterleavedFlavor, InterleavedLayout, InterleavedMemoryManager,
    InterleavedRange, RangeError, StagingQueue, StripedInterleavedBuffer,
};
pub use change_tracker::ChangeTracker;
pub use dirty_list::{DirtyList, DirtyListState};
pub use instance_registry::{Instance, InstanceRegistry};
pub use mesh::{MeshTopology, Orientation, VertexAdjacency};
