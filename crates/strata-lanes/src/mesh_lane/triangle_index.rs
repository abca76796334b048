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

//! Triangle index buffer with chained primitive params and edge indices.

use crate::source::{BufferSource, BufferSourceHandle, ChainedBufferSource, ResolveState};
use std::sync::{Arc, OnceLock};
use strata_core::{PrimPath, ScalarType, TupleType};
use strata_data::mesh::{triangulate, MeshTopology};

/// Fan-triangulates a polygon mesh into an `indices` buffer.
///
/// Resolving also fills two chained buffers: `primitiveParam` (one coarse
/// face param per triangle) and `edgeIndices` (authored edge per triangle).
/// A face that runs past the end of the index list fails all three.
#[derive(Debug)]
pub struct TriangleIndexBuilder {
    id: PrimPath,
    topology: Arc<MeshTopology>,
    data: OnceLock<Vec<u8>>,
    primitive_param: Arc<ChainedBufferSource>,
    edge_indices: Arc<ChainedBufferSource>,
    state: ResolveState,
}

impl TriangleIndexBuilder {
    /// Channel name of the triangle indices.
    pub const INDICES: &'static str = "indices";
    /// Channel name of the chained coarse face params.
    pub const PRIMITIVE_PARAM: &'static str = "primitiveParam";
    /// Channel name of the chained edge indices.
    pub const EDGE_INDICES: &'static str = "edgeIndices";

    /// Creates a builder for the mesh `id`.
    pub fn new(id: PrimPath, topology: Arc<MeshTopology>) -> Self {
        Self {
            id,
            topology,
            data: OnceLock::new(),
            primitive_param: Arc::new(ChainedBufferSource::new(
                Self::PRIMITIVE_PARAM,
                TupleType::new(ScalarType::Int32, 1),
            )),
            edge_indices: Arc::new(ChainedBufferSource::new(
                Self::EDGE_INDICES,
                TupleType::new(ScalarType::Int32, 1),
            )),
            state: ResolveState::new(),
        }
    }

    /// The mesh being triangulated.
    pub fn topology(&self) -> &Arc<MeshTopology> {
        &self.topology
    }

    /// The chained coarse face param buffer.
    pub fn primitive_param(&self) -> &Arc<ChainedBufferSource> {
        &self.primitive_param
    }

    /// The chained edge index buffer.
    pub fn edge_indices(&self) -> &Arc<ChainedBufferSource> {
        &self.edge_indices
    }
}

impl BufferSource for TriangleIndexBuilder {
    fn name(&self) -> &str {
        Self::INDICES
    }

    fn tuple_type(&self) -> TupleType {
        TupleType::new(ScalarType::Int32, 3)
    }

    fn data(&self) -> Option<&[u8]> {
        self.data.get().map(Vec::as_slice)
    }

    fn resolve(&self) -> bool {
        if !self.state.try_lock() {
            return self.state.is_settled();
        }

        let triangulation = triangulate(&self.id, &self.topology);
        if triangulation.invalid_topology {
            log::warn!("invalid topology for {}, triangle indices not built", self.id);
            self.primitive_param.fail();
            self.edge_indices.fail();
            self.state.set_resolve_error();
            return true;
        }

        log::trace!(
            "{}: {} faces -> {} triangles",
            self.id,
            self.topology.num_faces(),
            triangulation.indices.len()
        );
        self.primitive_param
            .fill(bytemuck::cast_slice(&triangulation.primitive_params).to_vec());
        self.edge_indices
            .fill(bytemuck::cast_slice(&triangulation.edge_indices).to_vec());
        let _ = self
            .data
            .set(bytemuck::cast_slice(&triangulation.indices).to_vec());
        self.state.set_resolved();
        true
    }

    fn state(&self) -> &ResolveState {
        &self.state
    }

    fn chained_buffers(&self) -> Vec<BufferSourceHandle> {
        vec![self.primitive_param.clone(), self.edge_indices.clone()]
    }
}
