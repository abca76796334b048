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

//! Smooth vertex normals computed on the host.

use super::VertexAdjacencyBuilder;
use crate::source::{
    collect_values, input_status, BufferSource, BufferSourceHandle, InputStatus, ResolveState,
};
use std::sync::{Arc, OnceLock};
use strata_core::{ScalarType, TupleType};

/// Computes per-point smooth normals from an adjacency table and points.
///
/// Depends on both sources; returns "not yet" until they resolve and fails
/// if either fails or the points are not `float3`.
#[derive(Debug)]
pub struct SmoothNormalsComputation {
    adjacency: Arc<VertexAdjacencyBuilder>,
    inputs: [BufferSourceHandle; 2],
    dst_name: String,
    data: OnceLock<Vec<u8>>,
    state: ResolveState,
}

impl SmoothNormalsComputation {
    /// Creates the computation writing to `dst_name` (usually `normals`).
    pub fn new(
        adjacency: Arc<VertexAdjacencyBuilder>,
        points: BufferSourceHandle,
        dst_name: impl Into<String>,
    ) -> Self {
        let adjacency_source: BufferSourceHandle = adjacency.clone();
        Self {
            adjacency,
            inputs: [adjacency_source, points],
            dst_name: dst_name.into(),
            data: OnceLock::new(),
            state: ResolveState::new(),
        }
    }

    fn points(&self) -> &BufferSourceHandle {
        &self.inputs[1]
    }
}

impl BufferSource for SmoothNormalsComputation {
    fn name(&self) -> &str {
        &self.dst_name
    }

    fn tuple_type(&self) -> TupleType {
        TupleType::new(ScalarType::Float32, 3)
    }

    fn data(&self) -> Option<&[u8]> {
        self.data.get().map(Vec::as_slice)
    }

    fn resolve(&self) -> bool {
        match input_status(&self.inputs) {
            InputStatus::Pending => return false,
            InputStatus::Failed => {
                if self.state.try_lock() {
                    log::warn!("'{}': adjacency or points failed to resolve", self.dst_name);
                    self.state.set_resolve_error();
                }
                return self.state.is_settled();
            }
            InputStatus::Ready => {}
        }

        if !self.state.try_lock() {
            return self.state.is_settled();
        }

        let points = collect_values::<[f32; 3]>(self.points().as_ref());
        match (self.adjacency.adjacency(), points) {
            (Some(adjacency), Some(points)) => {
                if points.len() < adjacency.num_points() {
                    log::warn!(
                        "'{}': {} points for an adjacency of {}",
                        self.dst_name,
                        points.len(),
                        adjacency.num_points()
                    );
                }
                let normals = adjacency.compute_smooth_normals(&points);
                let _ = self.data.set(bytemuck::cast_slice(&normals).to_vec());
                self.state.set_resolved();
            }
            _ => {
                log::warn!("'{}': points are not float3", self.dst_name);
                self.state.set_resolve_error();
            }
        }
        true
    }

    fn state(&self) -> &ResolveState {
        &self.state
    }

    fn check_valid(&self) -> bool {
        !self.dst_name.is_empty()
            && self
                .points()
                .tuple_type()
                .same_element_type(&TupleType::new(ScalarType::Float32, 3))
    }
}
