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

//! Named, typed data channels and their set algebra.

use std::fmt;

/// The scalar component type of a data channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// Signed 8-bit integer.
    Int8,
    /// Unsigned 8-bit integer.
    UInt8,
    /// Signed 16-bit integer.
    Int16,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Signed 32-bit integer.
    Int32,
    /// Unsigned 32-bit integer.
    UInt32,
    /// IEEE half-precision float.
    Float16,
    /// IEEE single-precision float.
    Float32,
    /// IEEE double-precision float.
    Float64,
    /// Four signed components packed as 2-10-10-10 bits into one 32-bit word.
    PackedInt1010102,
}

impl ScalarType {
    /// Size in bytes of a single component.
    pub const fn size(&self) -> usize {
        match self {
            ScalarType::Int8 | ScalarType::UInt8 => 1,
            ScalarType::Int16 | ScalarType::UInt16 | ScalarType::Float16 => 2,
            ScalarType::Int32
            | ScalarType::UInt32
            | ScalarType::Float32
            | ScalarType::PackedInt1010102 => 4,
            ScalarType::Float64 => 8,
        }
    }
}

/// An element type (scalar and component count) repeated `count` times.
///
/// A `vec3` of floats is `TupleType::new(ScalarType::Float32, 3)`; a 4x4
/// double matrix is `TupleType::new(ScalarType::Float64, 16)`; a fixed-size
/// array of eight `vec4`s uses `with_count(8)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TupleType {
    /// The scalar component type.
    pub scalar: ScalarType,
    /// Number of components per element.
    pub components: usize,
    /// Array size; 1 for non-array data.
    pub count: usize,
}

impl TupleType {
    /// Creates a non-array tuple type.
    pub const fn new(scalar: ScalarType, components: usize) -> Self {
        Self {
            scalar,
            components,
            count: 1,
        }
    }

    /// Returns the same element type with the given array size.
    #[must_use]
    pub const fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Size in bytes of one element (all components, ignoring the array size).
    pub const fn element_size(&self) -> usize {
        self.scalar.size() * self.components
    }

    /// Size in bytes of the whole tuple including the array size.
    pub const fn byte_size(&self) -> usize {
        self.element_size() * self.count
    }

    /// Struct-packing alignment of this tuple.
    ///
    /// The component size times `min(components, 4)`, with three-component
    /// vectors occupying a four-component slot. Matrices pack as arrays of
    /// four-component rows.
    pub const fn alignment(&self) -> usize {
        let mut align_components = if self.components < 4 {
            self.components
        } else {
            4
        };
        if align_components == 3 {
            align_components = 4;
        }
        self.scalar.size() * align_components
    }

    /// Returns `true` if both tuples share the same scalar and component count.
    pub const fn same_element_type(&self, other: &TupleType) -> bool {
        self.scalar as u8 == other.scalar as u8 && self.components == other.components
    }
}

/// Describes one named, typed, fixed-arity data channel.
///
/// Equality and hashing are structural over name and tuple type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BufferSpec {
    /// Channel name (e.g. `points`, `normals`, `transform`).
    pub name: String,
    /// Element type and array size.
    pub tuple_type: TupleType,
}

impl BufferSpec {
    /// Creates a spec from its name, scalar type, component count and array size.
    pub fn new(
        name: impl Into<String>,
        scalar: ScalarType,
        components: usize,
        array_size: usize,
    ) -> Self {
        Self {
            name: name.into(),
            tuple_type: TupleType::new(scalar, components).with_count(array_size),
        }
    }

    /// Creates a spec from a name and an existing tuple type.
    pub fn from_tuple(name: impl Into<String>, tuple_type: TupleType) -> Self {
        Self {
            name: name.into(),
            tuple_type,
        }
    }

    /// Returns `false` for a spec with an empty name, no components, or no elements.
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty() && self.tuple_type.components > 0 && self.tuple_type.count > 0
    }

    /// Returns `true` if every spec in `subset` also appears in `superset`.
    pub fn is_subset(subset: &[BufferSpec], superset: &[BufferSpec]) -> bool {
        subset.iter().all(|spec| superset.contains(spec))
    }

    /// Returns the specs of `a` followed by those of `b` not already present.
    ///
    /// Duplicates inside either input are collapsed.
    pub fn compute_union(a: &[BufferSpec], b: &[BufferSpec]) -> Vec<BufferSpec> {
        let mut result: Vec<BufferSpec> = Vec::with_capacity(a.len() + b.len());
        for spec in a.iter().chain(b.iter()) {
            if !result.contains(spec) {
                result.push(spec.clone());
            }
        }
        result
    }

    /// Returns the specs of `a` that do not appear in `b`, in `a`'s order.
    pub fn compute_difference(a: &[BufferSpec], b: &[BufferSpec]) -> Vec<BufferSpec> {
        let mut result: Vec<BufferSpec> = Vec::with_capacity(a.len());
        for spec in a {
            if !b.contains(spec) && !result.contains(spec) {
                result.push(spec.clone());
            }
        }
        result
    }
}

impl fmt::Display for BufferSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:?} x{}, count {})",
            self.name, self.tuple_type.scalar, self.tuple_type.components, self.tuple_type.count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points() -> BufferSpec {
        BufferSpec::new("points", ScalarType::Float32, 3, 1)
    }

    fn normals() -> BufferSpec {
        BufferSpec::new("normals", ScalarType::Float32, 3, 1)
    }

    fn color() -> BufferSpec {
        BufferSpec::new("color", ScalarType::Float32, 4, 1)
    }

    #[test]
    fn test_sizes_and_alignment() {
        let vec3 = TupleType::new(ScalarType::Float32, 3);
        assert_eq!(vec3.byte_size(), 12);
        assert_eq!(vec3.alignment(), 16);

        let dmat4 = TupleType::new(ScalarType::Float64, 16);
        assert_eq!(dmat4.byte_size(), 128);
        assert_eq!(dmat4.alignment(), 32);

        let int2 = TupleType::new(ScalarType::Int32, 2);
        assert_eq!(int2.alignment(), 8);

        let array = TupleType::new(ScalarType::Float32, 4).with_count(8);
        assert_eq!(array.byte_size(), 128);
        assert_eq!(array.alignment(), 16);
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(points(), BufferSpec::new("points", ScalarType::Float32, 3, 1));
        assert_ne!(points(), BufferSpec::new("points", ScalarType::Float64, 3, 1));
        assert_ne!(points(), BufferSpec::new("points", ScalarType::Float32, 3, 2));
    }

    #[test]
    fn test_is_subset() {
        let a = vec![points()];
        let b = vec![points(), normals()];
        assert!(BufferSpec::is_subset(&a, &b));
        assert!(!BufferSpec::is_subset(&b, &a));
        assert!(BufferSpec::is_subset(&[], &a));
    }

    #[test]
    fn test_union_counts_intersection_once() {
        let a = vec![points(), normals()];
        let b = vec![normals(), color()];
        let union = BufferSpec::compute_union(&a, &b);
        let intersection = a.iter().filter(|s| b.contains(s)).count();
        assert_eq!(union.len(), a.len() + b.len() - intersection);
        assert_eq!(union, vec![points(), normals(), color()]);
    }

    #[test]
    fn test_difference_is_disjoint_from_subtrahend() {
        let a = vec![points(), normals(), color()];
        let b = vec![normals()];
        let difference = BufferSpec::compute_difference(&a, &b);
        assert_eq!(difference, vec![points(), color()]);
        assert!(difference.iter().all(|s| !b.contains(s)));
    }
}
