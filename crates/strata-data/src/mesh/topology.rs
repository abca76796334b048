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


//! Polygonal mesh topology and its content hash.

use std::hash::{BuildHasher, Hash, Hasher};

/// Winding order of authored faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    /// Counter-clockwise faces are front facing.
    #[default]
    RightHanded,
    /// Clockwise faces are front facing.
    LeftHanded,
}

/// Face-vertex topology of a polygon mesh.
///
/// Shared between prims through the topology instance registry, so two
/// meshes with equal topology hash to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct MeshTopology {
    orientation: Orientation,
    face_vertex_counts: Vec<i32>,
    face_vertex_indices: Vec<i32>,
    hole_indices: Vec<i32>,
}

impl MeshTopology {
    /// Creates a right-handed topology from per-face vertex counts and the flat index list.
    pub fn new(face_vertex_counts: Vec<i32>, face_vertex_indices: Vec<i32>) -> Self {
        Self {
            orientation: Orientation::RightHanded,
            face_vertex_counts,
            face_vertex_indices,
            hole_indices: Vec::new(),
        }
    }

    /// Sets the winding order.
    #[must_use]
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Sets the faces to skip when triangulating. Indices are sorted.
    #[must_use]
    pub fn with_hole_indices(mut self, mut hole_indices: Vec<i32>) -> Self {
        hole_indices.sort_unstable();
        hole_indices.dedup();
        self.hole_indices = hole_indices;
        self
    }

    /// Winding order of the faces.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Number of vertices of each face.
    pub fn face_vertex_counts(&self) -> &[i32] {
        &self.face_vertex_counts
    }

    /// Point indices of all faces, concatenated.
    pub fn face_vertex_indices(&self) -> &[i32] {
        &self.face_vertex_indices
    }

    /// Sorted indices of faces that are holes.
    pub fn hole_indices(&self) -> &[i32] {
        &self.hole_indices
    }

    /// Number of authored faces.
    pub fn num_faces(&self) -> usize {
        self.face_vertex_counts.len()
    }

    /// Number of face-varying values (one per face-vertex).
    pub fn num_face_varyings(&self) -> usize {
        self.face_vertex_indices.len()
    }

    /// Number of points referenced: the highest index plus one.
    pub fn compute_num_points(&self) -> usize {
        self.face_vertex_indices
            .iter()
            .copied()
            .filter(|&index| index >= 0)
            .max()
            .map_or(0, |max| max as usize + 1)
    }

    /// Stable content hash used as the deduplication key.
    pub fn compute_hash(&self) -> u64 {
        let mut hasher = topology_hash_state().build_hasher();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

fn topology_hash_state() -> ahash::RandomState {
    ahash::RandomState::with_seeds(
        0x6d65_7368_746f_706f,
        0x6c6f_6779_0000_0001,
        0x243f_6a88_85a3_08d3,
        0x1319_8a2e_0370_7344,
    )
}
