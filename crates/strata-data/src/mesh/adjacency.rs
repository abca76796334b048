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


//! Vertex-to-face adjacency and smooth normals.

use super::topology::MeshTopology;
use std::fmt;

/// A topology referenced a point outside `[0, num_points)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjacencyError {
    /// The offending face-vertex index value.
    pub index: i32,
    /// Number of points the table was built for.
    pub num_points: usize,
}

impl fmt::Display for AdjacencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vertex index {} is out of range for {} points",
            self.index, self.num_points
        )
    }
}

impl std::error::Error for AdjacencyError {}

/// Per-point list of (previous, next) neighbours around every incident face.
///
/// Layout: `2 * num_points` header entries of `(offset, valence)`, followed
/// by `2 * valence` neighbour entries per point at `offset`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexAdjacency {
    num_points: usize,
    table: Vec<i32>,
}

impl VertexAdjacency {
    /// Builds the table for `topology`.
    ///
    /// On an out-of-range index the table is left empty and an error returned;
    /// the mesh should then be treated as unrenderable.
    pub fn build(topology: &MeshTopology) -> Result<Self, AdjacencyError> {
        let num_points = topology.compute_num_points();
        let counts = topology.face_vertex_counts();
        let verts = topology.face_vertex_indices();

        let mut valence = vec![0i32; num_points];
        let mut cursor = 0usize;
        for &count in counts {
            for _ in 0..count.max(0) {
                let index = verts.get(cursor).copied().unwrap_or(-1);
                if index < 0 || index as usize >= num_points {
                    log::warn!("vertex adjacency: index {index} out of range ({num_points} points)");
                    return Err(AdjacencyError { index, num_points });
                }
                valence[index as usize] += 1;
                cursor += 1;
            }
        }

        let header = num_points * 2;
        let total_valence: usize = valence.iter().map(|&v| v as usize).sum();
        let mut table = vec![0i32; header + total_valence * 2];

        let mut offset = header as i32;
        for (point, &count) in valence.iter().enumerate() {
            table[point * 2] = offset;
            table[point * 2 + 1] = 0;
            offset += count * 2;
        }

        let mut base = 0usize;
        for &count in counts {
            let count = count.max(0) as usize;
            for j in 0..count {
                let prev = verts[base + (j + count - 1) % count];
                let curr = verts[base + j] as usize;
                let next = verts[base + (j + 1) % count];

                let filled = table[curr * 2 + 1] as usize;
                let entry = table[curr * 2] as usize + filled * 2;
                table[entry] = prev;
                table[entry + 1] = next;
                table[curr * 2 + 1] += 1;
            }
            base += count;
        }

        Ok(Self { num_points, table })
    }

    /// Number of points covered.
    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// The raw table, suitable for upload.
    pub fn table(&self) -> &[i32] {
        &self.table
    }

    /// The (previous, next) neighbour pairs of `point`.
    pub fn neighbours(&self, point: usize) -> impl Iterator<Item = (i32, i32)> + '_ {
        let (offset, valence) = if point < self.num_points {
            (
                self.table[point * 2] as usize,
                self.table[point * 2 + 1] as usize,
            )
        } else {
            (0, 0)
        };
        self.table[offset..offset + valence * 2]
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
    }

    /// Area-weighted smooth vertex normals for `points`.
    ///
    /// Points beyond the table (or without incident faces) get a zero normal.
    pub fn compute_smooth_normals(&self, points: &[[f32; 3]]) -> Vec<[f32; 3]> {
        let mut normals = vec![[0.0f32; 3]; points.len()];
        let count = points.len().min(self.num_points);
        for (point, normal) in normals.iter_mut().enumerate().take(count) {
            let curr = points[point];
            let mut sum = [0.0f32; 3];
            for (prev, next) in self.neighbours(point) {
                let (Some(prev), Some(next)) = (points.get(prev as usize), points.get(next as usize))
                else {
                    continue;
                };
                let n = cross(sub(*next, curr), sub(*prev, curr));
                sum = [sum[0] + n[0], sum[1] + n[1], sum[2] + n[2]];
            }
            *normal = normalize(sum);
        }
        normals
    }
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let length = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if length > 0.0 {
        [v[0] / length, v[1] / length, v[2] / length]
    } else {
        v
    }
}
