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

//! A source wrapping data that is already available on the host.

use super::{BufferSource, ResolveState};
use strata_core::TupleType;

/// Typed host bytes, resolved from construction.
#[derive(Debug)]
pub struct ValueBufferSource {
    name: String,
    tuple_type: TupleType,
    data: Vec<u8>,
    state: ResolveState,
}

impl ValueBufferSource {
    /// Wraps a slice of plain-old-data values.
    pub fn new<T: bytemuck::Pod>(name: impl Into<String>, tuple_type: TupleType, values: &[T]) -> Self {
        Self::from_bytes(name, tuple_type, bytemuck::cast_slice(values).to_vec())
    }

    /// Wraps raw bytes.
    pub fn from_bytes(name: impl Into<String>, tuple_type: TupleType, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            tuple_type,
            data,
            state: ResolveState::resolved(),
        }
    }
}

impl BufferSource for ValueBufferSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn tuple_type(&self) -> TupleType {
        self.tuple_type
    }

    fn data(&self) -> Option<&[u8]> {
        Some(&self.data)
    }

    fn resolve(&self) -> bool {
        true
    }

    fn state(&self) -> &ResolveState {
        &self.state
    }

    fn check_valid(&self) -> bool {
        let size = self.tuple_type.byte_size();
        !self.name.is_empty() && size > 0 && self.data.len() % size == 0
    }
}
