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


//! Fan triangulation of polygon topology.

use super::topology::{MeshTopology, Orientation};
use strata_core::PrimPath;

/// Packs an authored face index and its wireframe edge flag into one value.
#[inline]
pub const fn encode_coarse_face_param(face_index: i32, edge_flag: i32) -> i32 {
    (face_index << 2) | (edge_flag & 3)
}

/// Extracts the authored face index from a coarse face param.
#[inline]
pub const fn decode_face_index(param: i32) -> i32 {
    param >> 2
}

/// Extracts the edge flag from a coarse face param.
///
/// `0` shows all edges, `1` hides the closing edge, `2` hides the first
/// edge, `3` hides both (interior fan triangles).
#[inline]
pub const fn decode_edge_flag(param: i32) -> i32 {
    param & 3
}

/// Output of [`triangulate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Triangulation {
    /// Three point indices per triangle.
    pub indices: Vec<[i32; 3]>,
    /// One coarse face param per triangle.
    pub primitive_params: Vec<i32>,
    /// Index of the authored edge each triangle was emitted for.
    pub edge_indices: Vec<i32>,
    /// Set when a face referenced past the end of the index list.
    pub invalid_topology: bool,
}

/// Triangulates every non-hole face with at least three vertices as a fan.
///
/// Faces with fewer than three vertices are skipped with a warning. A face
/// that runs past the end of the face-vertex index list emits zeroed
/// triangles and flags the result as invalid.
pub fn triangulate(id: &PrimPath, topology: &MeshTopology) -> Triangulation {
    let counts = topology.face_vertex_counts();
    let verts = topology.face_vertex_indices();
    let holes = topology.hole_indices();
    let num_vert_indices = verts.len() as i64;

    let mut num_tris = 0usize;
    let mut degenerate = false;
    let mut hole_cursor = 0usize;
    for (face, &count) in counts.iter().enumerate() {
        if count < 3 {
            degenerate = true;
        } else if hole_cursor < holes.len() && holes[hole_cursor] as usize == face {
            hole_cursor += 1;
        } else {
            num_tris += (count - 2) as usize;
        }
    }
    if degenerate {
        log::warn!("degenerated face found [{id}]");
    }

    let flip = topology.orientation() != Orientation::RightHanded;
    let mut result = Triangulation {
        indices: Vec::with_capacity(num_tris),
        primitive_params: Vec::with_capacity(num_tris),
        edge_indices: Vec::with_capacity(num_tris),
        invalid_topology: false,
    };

    hole_cursor = 0;
    let mut v: i64 = 0;
    let mut ev: i32 = 0;
    for (face, &nv) in counts.iter().enumerate() {
        if nv < 3 {
            // degenerate: skipped
        } else if hole_cursor < holes.len() && holes[hole_cursor] as usize == face {
            hole_cursor += 1;
        } else {
            let mut edge_flag = 0;
            let mut edge_index = ev;
            for j in 0..(nv - 2) {
                let mut triangle = match fan_triangle(verts, v, j as i64, num_vert_indices, flip) {
                    Some(triangle) => triangle,
                    None => {
                        result.invalid_topology = true;
                        [0, 0, 0]
                    }
                };

                if nv > 3 {
                    if j == 0 {
                        if flip {
                            triangle = [triangle[1], triangle[2], triangle[0]];
                        }
                        edge_flag = 1;
                    } else if j == nv - 3 {
                        if flip {
                            triangle = [triangle[2], triangle[0], triangle[1]];
                        }
                        edge_flag = 2;
                    } else {
                        edge_flag = 3;
                    }
                    edge_index += 1;
                }

                result.indices.push(triangle);
                result
                    .primitive_params
                    .push(encode_coarse_face_param(face as i32, edge_flag));
                result.edge_indices.push(edge_index);
            }
        }
        v += i64::from(nv);
        ev += nv;
    }

    if result.invalid_topology {
        log::warn!("numVerts and verts are inconsistent [{id}]");
    }
    result
}

fn fan_triangle(verts: &[i32], offset: i64, index: i64, size: i64, flip: bool) -> Option<[i32; 3]> {
    if offset < 0 || offset + index + 2 >= size {
        return None;
    }
    let base = offset as usize;
    let i = index as usize;
    Some(if flip {
        [verts[base], verts[base + i + 2], verts[base + i + 1]]
    } else {
        [verts[base], verts[base + i + 1], verts[base + i + 2]]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> PrimPath {
        PrimPath::new("/mesh")
    }

    #[test]
    fn test_single_triangle() {
        let topology = MeshTopology::new(vec![3], vec![0, 1, 2]);
        let result = triangulate(&id(), &topology);
        assert_eq!(result.indices, vec![[0, 1, 2]]);
        assert_eq!(result.primitive_params, vec![0]);
        assert!(!result.invalid_topology);
    }

    #[test]
    fn test_pentagon_edge_flags() {
        let topology = MeshTopology::new(vec![3, 5], vec![0, 1, 2, 0, 1, 2, 3, 4]);
        let result = triangulate(&id(), &topology);
        assert_eq!(
            result.indices,
            vec![[0, 1, 2], [0, 1, 2], [0, 2, 3], [0, 3, 4]]
        );
        let flags: Vec<i32> = result
            .primitive_params
            .iter()
            .map(|&p| decode_edge_flag(p))
            .collect();
        assert_eq!(flags, vec![0, 1, 3, 2]);
        let faces: Vec<i32> = result
            .primitive_params
            .iter()
            .map(|&p| decode_face_index(p))
            .collect();
        assert_eq!(faces, vec![0, 1, 1, 1]);
    }

    #[test]
    fn test_left_handed_quad_rotates_outer_triangles() {
        let topology =
            MeshTopology::new(vec![4], vec![0, 1, 2, 3]).with_orientation(Orientation::LeftHanded);
        let result = triangulate(&id(), &topology);
        // Flipped fans are 0-2-1 and 0-3-2, then rotated to keep the hidden edge.
        assert_eq!(result.indices, vec![[2, 1, 0], [2, 0, 3]]);
        assert_eq!(result.primitive_params, vec![1, 2]);
    }

    #[test]
    fn test_degenerate_and_hole_faces_are_skipped() {
        let topology = MeshTopology::new(vec![2, 3, 3], vec![0, 1, 0, 1, 2, 1, 2, 3])
            .with_hole_indices(vec![1]);
        let result = triangulate(&id(), &topology);
        assert_eq!(result.indices, vec![[1, 2, 3]]);
        assert_eq!(decode_face_index(result.primitive_params[0]), 2);
        assert!(!result.invalid_topology);
    }

    #[test]
    fn test_overrun_flags_invalid_topology() {
        let topology = MeshTopology::new(vec![4], vec![0, 1, 2]);
        let result = triangulate(&id(), &topology);
        assert!(result.invalid_topology);
        assert_eq!(result.indices, vec![[0, 1, 2], [0, 0, 0]]);
    }
}
