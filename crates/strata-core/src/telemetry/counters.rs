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


//! Well-known counter names reported by the aggregation layer.
//!
//! All counters live in the [`RESOURCE_NAMESPACE`] namespace unless stated
//! otherwise. Cache statistics are labelled under [`CACHE_NAMESPACE`].

/// Namespace for resource and sync counters.
pub const RESOURCE_NAMESPACE: &str = "resource";
/// Namespace for cache hit/miss statistics.
pub const CACHE_NAMESPACE: &str = "cache";

/// Number of buffer sources resolved by commit.
pub const BUFFER_SOURCES_RESOLVED: &str = "buffer_sources_resolved";
/// Number of computations executed by commit.
pub const COMPUTATIONS_COMMITTED: &str = "computations_committed";
/// Number of aggregate reallocations.
pub const VBO_RELOCATED: &str = "vbo_relocated";
/// Number of ranges moved to a new aggregate because their spec set changed.
pub const BUFFER_ARRAY_RANGE_MIGRATED: &str = "buffer_array_range_migrated";
/// Number of host-to-device writes issued.
pub const COPY_BUFFER_CPU_TO_GPU: &str = "copy_buffer_cpu_to_gpu";
/// Number of device-to-device copies issued.
pub const COPY_BUFFER_GPU_TO_GPU: &str = "copy_buffer_gpu_to_gpu";
/// Number of uniform aggregates released by garbage collection.
pub const GARBAGE_COLLECTED_UBO: &str = "garbage_collected_ubo";
/// Number of storage aggregates released by garbage collection.
pub const GARBAGE_COLLECTED_SSBO: &str = "garbage_collected_ssbo";
/// Number of dirty lists rebuilt from scratch.
pub const DIRTY_LISTS_REBUILT: &str = "dirty_lists_rebuilt";
/// Number of device bytes allocated at the last tally.
pub const GPU_MEMORY_USED: &str = "gpu_memory_used";

/// Live entries in the mesh topology instance registry.
pub const INST_MESH_TOPOLOGY: &str = "inst_mesh_topology";
/// Live entries in the vertex adjacency instance registry.
pub const INST_VERTEX_ADJACENCY: &str = "inst_vertex_adjacency";
/// Live entries in the topology range instance registry.
pub const INST_MESH_TOPOLOGY_RANGE: &str = "inst_mesh_topology_range";
/// Live entries in the primvar range instance registry.
pub const INST_PRIMVAR_RANGE: &str = "inst_primvar_range";

/// Cache label for collection dirtiness queries.
pub const COLLECTIONS_CLEAN_CACHE: &str = "collections_clean";
/// Cache label for per-prim dirty-bit queries.
pub const RPRIM_DIRTY_CACHE: &str = "rprim_dirty";
