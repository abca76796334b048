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


//! Mesh topology and the host-side derivations built from it.

pub mod adjacency;
pub mod topology;
pub mod triangulate;

pub use adjacency::{AdjacencyError, VertexAdjacency};
pub use topology::{MeshTopology, Orientation};
pub use triangulate::{
    decode_edge_flag, decode_face_index, encode_coarse_face_param, triangulate, Triangulation,
};
