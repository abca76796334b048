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

//! Device-to-device copy of one channel between two ranges.

use super::{Computation, ComputationContext};
use std::sync::Arc;
use strata_core::telemetry::counters;
use strata_core::BufferSpec;
use strata_data::{InterleavedRange, RangeError};

/// Copies one named channel from a source range into the destination range.
///
/// Used when a primitive migrates to a new aggregate: the channels it keeps
/// are moved on the device instead of being re-uploaded from the host.
#[derive(Debug)]
pub struct CopyComputation {
    source: Arc<InterleavedRange>,
    spec: BufferSpec,
}

impl CopyComputation {
    /// Creates a copy of `spec` out of `source`.
    pub fn new(source: Arc<InterleavedRange>, spec: BufferSpec) -> Self {
        Self { source, spec }
    }

    /// The range being copied from.
    pub fn source(&self) -> &Arc<InterleavedRange> {
        &self.source
    }

    /// The channel being copied.
    pub fn spec(&self) -> &BufferSpec {
        &self.spec
    }
}

impl Computation for CopyComputation {
    fn execute(
        &self,
        range: &InterleavedRange,
        context: &ComputationContext<'_>,
    ) -> Result<(), RangeError> {
        let name = self.spec.name.as_str();

        let src_buffer = self
            .source
            .aggregate()
            .and_then(|aggregate| aggregate.buffer_id())
            .ok_or(RangeError::InvalidRange)?;
        let src_offset = self
            .source
            .byte_offset(name)
            .ok_or_else(|| RangeError::MissingResource(name.to_owned()))?;

        let dst_aggregate = range.aggregate().ok_or(RangeError::Unassigned)?;
        let dst_field = dst_aggregate
            .layout()
            .field(name)
            .ok_or_else(|| RangeError::MissingResource(name.to_owned()))?;
        if !dst_field.tuple_type.same_element_type(&self.spec.tuple_type) {
            return Err(RangeError::TypeMismatch {
                name: name.to_owned(),
                expected: dst_field.tuple_type,
                found: self.spec.tuple_type,
            });
        }
        let dst_buffer = dst_aggregate.buffer_id().ok_or(RangeError::InvalidRange)?;
        let dst_offset = range.byte_offset(name).ok_or(RangeError::InvalidRange)?;

        if src_buffer == dst_buffer && src_offset == dst_offset {
            return Ok(());
        }

        let size = (self.spec.tuple_type.byte_size() * self.num_output_elements()) as u64;
        log::trace!(
            "copy '{name}': {src_buffer:?}+{src_offset} -> {dst_buffer:?}+{dst_offset} ({size} bytes)"
        );
        context.backend.copy_buffer_to_buffer(
            src_buffer,
            src_offset as u64,
            dst_buffer,
            dst_offset as u64,
            size,
        )?;
        context
            .telemetry
            .increment_counter(counters::COPY_BUFFER_GPU_TO_GPU);
        Ok(())
    }

    fn num_output_elements(&self) -> usize {
        self.source.num_elements()
    }

    fn add_buffer_specs(&self, specs: &mut Vec<BufferSpec>) {
        specs.push(self.spec.clone());
    }

    fn is_valid(&self) -> bool {
        self.source.is_valid() && self.spec.is_valid()
    }
}
