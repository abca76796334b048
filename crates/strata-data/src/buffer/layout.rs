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


//! Struct packing of interleaved fields.
//!
//! ```text
//!          .--field["color"].offset
//!          v
//! .----------------------------------------.
//! | xform : color || xform : color || ...  |
//! '----------------------------------------'
//!  ^-- stride ---^
//! ```

use strata_core::{BufferSpec, TupleType};

/// Bytes needed to advance `offset` to the next multiple of `alignment`.
///
/// `alignment` must be zero or a power of two; zero means unaligned.
#[inline]
pub const fn compute_padding(alignment: usize, offset: usize) -> usize {
    if alignment == 0 {
        return 0;
    }
    (alignment - (offset & (alignment - 1))) & (alignment - 1)
}

/// Placement of one named field inside the interleaved struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    /// Field name.
    pub name: String,
    /// Element type and array size.
    pub tuple_type: TupleType,
    /// Byte offset of the field inside one struct.
    pub offset: usize,
    /// Alignment the field was placed with.
    pub alignment: usize,
}

/// The packed struct for an ordered list of buffer specs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterleavedLayout {
    stride: usize,
    fields: Vec<FieldLayout>,
}

impl InterleavedLayout {
    /// Packs `specs` in order.
    ///
    /// `struct_alignment` is the minimum alignment of the whole struct (16 for
    /// uniform blocks, 0 for storage blocks); the stride is additionally
    /// padded to `buffer_offset_alignment` when that is non-zero.
    pub fn new(specs: &[BufferSpec], struct_alignment: usize, buffer_offset_alignment: usize) -> Self {
        let mut struct_alignment = struct_alignment;
        let mut offset = 0usize;
        let mut fields = Vec::with_capacity(specs.len());

        for spec in specs {
            let alignment = spec.tuple_type.alignment();
            offset += compute_padding(alignment, offset);
            struct_alignment = struct_alignment.max(alignment);
            fields.push(FieldLayout {
                name: spec.name.clone(),
                tuple_type: spec.tuple_type,
                offset,
                alignment,
            });
            offset += spec.tuple_type.byte_size();
        }

        let mut stride = offset + compute_padding(struct_alignment, offset);
        if buffer_offset_alignment > 0 {
            stride += compute_padding(buffer_offset_alignment, stride);
        }

        log::trace!("interleaved layout: stride = {stride}");
        for field in &fields {
            log::trace!(
                "  {} : offset = {}, alignment = {}",
                field.name,
                field.offset,
                field.alignment
            );
        }

        Self { stride, fields }
    }

    /// Bytes per struct.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Fields in spec order.
    pub fn fields(&self) -> &[FieldLayout] {
        &self.fields
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// The specs this layout was built from, in order.
    pub fn buffer_specs(&self) -> Vec<BufferSpec> {
        self.fields
            .iter()
            .map(|field| BufferSpec::from_tuple(field.name.clone(), field.tuple_type))
            .collect()
    }
}
