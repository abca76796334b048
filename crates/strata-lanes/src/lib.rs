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

//! # Strata Lanes
//!
//! The producers of the aggregation layer. A lane turns scene data into
//! bytes ready for upload: value and derived buffer sources, the mesh
//! producers (triangle indices, vertex adjacency, smooth normals), and the
//! GPU-side computations that run after upload.
//!
//! Producers never block. A source whose inputs are not ready reports
//! "not yet" and is retried by the commit loop of the resource registry.

#![warn(missing_docs)]

pub mod computation;
pub mod mesh_lane;
pub mod source;

pub use computation::{Computation, ComputationContext, ComputeQueue, CopyComputation};
pub use mesh_lane::{SmoothNormalsComputation, TriangleIndexBuilder, VertexAdjacencyBuilder};
pub use source::{
    collect_values, BufferSource, BufferSourceHandle, ChainedBufferSource, DerivedBufferSource, ResolveState,
    ValueBufferSource,
};
