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

//! Shared-instance sub-registries of the resource registry.
//!
//! Each returns an [`Instance`] holding the registry's insertion lock; the
//! caller populates a first instance before dropping it. Entries live as
//! long as something outside the registry holds their value and are
//! reclaimed by [`ResourceRegistry::garbage_collect`].

use super::registry::ResourceRegistry;
use strata_data::mesh::MeshTopology;
use strata_data::{Instance, InterleavedRange};
use strata_lanes::VertexAdjacencyBuilder;

impl ResourceRegistry {
    /// Topology shared by every mesh hashing to `id`.
    pub fn register_mesh_topology(&self, id: u64) -> Instance<'_, u64, MeshTopology> {
        self.mesh_topologies.get_instance(id)
    }

    /// Adjacency builder shared by every mesh whose topology hashes to `id`.
    pub fn register_vertex_adjacency(&self, id: u64) -> Instance<'_, u64, VertexAdjacencyBuilder> {
        self.vertex_adjacencies.get_instance(id)
    }

    /// Range holding the `name` buffers (e.g. `indices`) derived from the
    /// topology hashing to `id`.
    pub fn register_mesh_index_range(
        &self,
        id: u64,
        name: &str,
    ) -> Instance<'_, (u64, String), InterleavedRange> {
        self.mesh_index_ranges.get_instance((id, name.to_owned()))
    }

    /// Range holding primvar data shared by every prim hashing to `id`.
    pub fn register_primvar_range(&self, id: u64) -> Instance<'_, u64, InterleavedRange> {
        self.primvar_ranges.get_instance(id)
    }
}
