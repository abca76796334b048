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

//! Vertex adjacency table producer.

use crate::source::{BufferSource, ResolveState};
use std::sync::{Arc, OnceLock};
use strata_core::{ScalarType, TupleType};
use strata_data::mesh::{MeshTopology, VertexAdjacency};

/// Builds the vertex adjacency table of a topology.
///
/// Shared between every mesh using the same topology; the resolved table is
/// both uploaded as an `adjacency` buffer and read back on the host by
/// [`SmoothNormalsComputation`](super::SmoothNormalsComputation).
#[derive(Debug)]
pub struct VertexAdjacencyBuilder {
    topology: Arc<MeshTopology>,
    adjacency: OnceLock<Arc<VertexAdjacency>>,
    data: OnceLock<Vec<u8>>,
    state: ResolveState,
}

impl VertexAdjacencyBuilder {
    /// Channel name of the adjacency table.
    pub const ADJACENCY: &'static str = "adjacency";

    /// Creates a builder for `topology`.
    pub fn new(topology: Arc<MeshTopology>) -> Self {
        Self {
            topology,
            adjacency: OnceLock::new(),
            data: OnceLock::new(),
            state: ResolveState::new(),
        }
    }

    /// The topology the table is built from.
    pub fn topology(&self) -> &Arc<MeshTopology> {
        &self.topology
    }

    /// The built table, once resolved.
    pub fn adjacency(&self) -> Option<&Arc<VertexAdjacency>> {
        self.adjacency.get()
    }
}

impl BufferSource for VertexAdjacencyBuilder {
    fn name(&self) -> &str {
        Self::ADJACENCY
    }

    fn tuple_type(&self) -> TupleType {
        TupleType::new(ScalarType::Int32, 1)
    }

    fn data(&self) -> Option<&[u8]> {
        self.data.get().map(Vec::as_slice)
    }

    fn resolve(&self) -> bool {
        if !self.state.try_lock() {
            return self.state.is_settled();
        }

        match VertexAdjacency::build(&self.topology) {
            Ok(adjacency) => {
                let _ = self.data.set(bytemuck::cast_slice(adjacency.table()).to_vec());
                let _ = self.adjacency.set(Arc::new(adjacency));
                self.state.set_resolved();
            }
            Err(err) => {
                log::warn!("vertex adjacency not built: {err}");
                self.state.set_resolve_error();
            }
        }
        true
    }

    fn state(&self) -> &ResolveState {
        &self.state
    }
}
