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


//! A primitive's row inside a striped interleaved aggregate.

use super::error::RangeError;
use super::striped::StripedInterleavedBuffer;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use strata_core::telemetry::counters;
use strata_core::{BufferSpec, TupleType, UsageHint};

#[derive(Debug)]
struct RangeState {
    aggregate: Option<Arc<StripedInterleavedBuffer>>,
    index: Option<usize>,
    num_elements: usize,
}

/// A handle onto one struct-sized row of an interleaved aggregate.
///
/// Owned by the primitive's shared data; the aggregate only observes it
/// weakly. Dropping the last handle marks the aggregate for compaction.
pub struct InterleavedRange {
    state: Mutex<RangeState>,
}

impl InterleavedRange {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(RangeState {
                aggregate: None,
                index: None,
                num_elements: 1,
            }),
        }
    }

    /// `true` while the range is attached to an aggregate.
    pub fn is_valid(&self) -> bool {
        self.state.lock().aggregate.is_some()
    }

    /// `true` once an aggregate accepted the range.
    pub fn is_assigned(&self) -> bool {
        self.is_valid()
    }

    /// `true` if the owning aggregate was created with the immutable hint.
    pub fn is_immutable(&self) -> bool {
        self.aggregate().is_some_and(|a| a.is_immutable())
    }

    /// The owning aggregate, if any.
    pub fn aggregate(&self) -> Option<Arc<StripedInterleavedBuffer>> {
        self.state.lock().aggregate.clone()
    }

    /// Returns `true` if both ranges live in the same aggregate.
    pub fn is_same_aggregate(&self, other: &InterleavedRange) -> bool {
        match (self.aggregate(), other.aggregate()) {
            (Some(a), Some(b)) => Arc::ptr_eq(&a, &b),
            _ => false,
        }
    }

    /// Row index inside the aggregate, or `None` before the first reallocation.
    pub fn element_offset(&self) -> Option<usize> {
        self.state.lock().index
    }

    /// Byte offset of the named field for this row.
    pub fn byte_offset(&self, name: &str) -> Option<usize> {
        let (aggregate, index) = {
            let state = self.state.lock();
            (state.aggregate.clone()?, state.index?)
        };
        let field = aggregate.layout().field(name)?;
        Some(field.offset + aggregate.stride() * index)
    }

    /// Number of rows covered (always one for interleaved data).
    pub fn num_elements(&self) -> usize {
        self.state.lock().num_elements
    }

    /// Interleaved rows never resize in place; growth happens through the
    /// aggregate's reallocation. Always returns `false`.
    pub fn resize(&self, num_elements: usize) -> bool {
        if !self.is_valid() {
            log::error!("resize({num_elements}) on an unassigned interleaved range");
        }
        false
    }

    /// Version of the owning aggregate; changes whenever its layout or
    /// storage moves.
    pub fn version(&self) -> u64 {
        self.aggregate().map_or(0, |a| a.version())
    }

    /// Bumps the owning aggregate's version.
    pub fn increment_version(&self) {
        if let Some(aggregate) = self.aggregate() {
            aggregate.increment_version();
        }
    }

    /// Row capacity of the owning aggregate.
    pub fn max_num_elements(&self) -> usize {
        self.aggregate().map_or(0, |a| a.max_num_ranges())
    }

    /// Usage hint of the owning aggregate.
    pub fn usage_hint(&self) -> UsageHint {
        self.aggregate().map_or(UsageHint::EMPTY, |a| a.usage_hint())
    }

    /// Specs of the owning aggregate.
    pub fn buffer_specs(&self) -> Vec<BufferSpec> {
        self.aggregate()
            .map(|a| a.buffer_specs())
            .unwrap_or_default()
    }

    /// Detaches the range without marking the aggregate for compaction.
    pub fn invalidate(&self) {
        self.state.lock().aggregate = None;
    }

    /// Stages `data` into the named field of this row.
    ///
    /// `data` holds `num_elements()` consecutive values of the field's tuple type.
    pub fn copy_data(&self, name: &str, tuple_type: TupleType, data: &[u8]) -> Result<(), RangeError> {
        let (aggregate, index, num_elements) = self.snapshot()?;
        let field = aggregate
            .layout()
            .field(name)
            .ok_or_else(|| RangeError::MissingResource(name.to_owned()))
            .inspect_err(|err| log::error!("copy_data: {err}"))?;
        let buffer = aggregate.buffer_id().ok_or(RangeError::InvalidRange)?;
        let index = index.ok_or(RangeError::InvalidRange)?;

        if !tuple_type.same_element_type(&field.tuple_type) {
            let err = RangeError::TypeMismatch {
                name: name.to_owned(),
                expected: field.tuple_type,
                found: tuple_type,
            };
            log::error!("copy_data: {err}");
            return Err(err);
        }

        let element_size = field.tuple_type.byte_size();
        let needed = element_size * num_elements;
        if data.len() < needed {
            return Err(RangeError::SizeMismatch {
                name: name.to_owned(),
                expected: needed,
                found: data.len(),
            });
        }

        let stride = aggregate.stride();
        let mut offset = field.offset + stride * index;
        for element in data[..needed].chunks_exact(element_size) {
            aggregate.staging().stage(buffer, offset as u64, element)?;
            offset += stride;
        }

        aggregate
            .telemetry()
            .add_counter(counters::COPY_BUFFER_CPU_TO_GPU, num_elements as u64);
        Ok(())
    }

    /// Reads the named field of this row back from the device.
    pub fn read_data(&self, name: &str) -> Result<Vec<u8>, RangeError> {
        let (aggregate, index, num_elements) = self.snapshot()?;
        let field = aggregate
            .layout()
            .field(name)
            .ok_or_else(|| RangeError::MissingResource(name.to_owned()))?;
        let buffer = aggregate.buffer_id().ok_or(RangeError::InvalidRange)?;
        let index = index.ok_or(RangeError::InvalidRange)?;

        let element_size = field.tuple_type.byte_size();
        let stride = aggregate.stride();
        let mut result = Vec::with_capacity(element_size * num_elements);
        let mut offset = field.offset + stride * index;
        for _ in 0..num_elements {
            let bytes = aggregate
                .backend()
                .read_buffer(buffer, offset as u64, element_size as u64)?;
            result.extend_from_slice(&bytes);
            offset += stride;
        }
        Ok(result)
    }

    pub(crate) fn assign(&self, aggregate: Arc<StripedInterleavedBuffer>) {
        self.state.lock().aggregate = Some(aggregate);
    }

    pub(crate) fn set_index(&self, aggregate: &Arc<StripedInterleavedBuffer>, index: usize) {
        let mut state = self.state.lock();
        state.aggregate = Some(aggregate.clone());
        state.index = Some(index);
    }

    fn snapshot(&self) -> Result<(Arc<StripedInterleavedBuffer>, Option<usize>, usize), RangeError> {
        let state = self.state.lock();
        let aggregate = state.aggregate.clone().ok_or(RangeError::Unassigned)?;
        Ok((aggregate, state.index, state.num_elements))
    }
}

impl Drop for InterleavedRange {
    fn drop(&mut self) {
        if let Some(aggregate) = self.state.get_mut().aggregate.take() {
            aggregate.set_needs_compaction();
        }
    }
}

impl fmt::Debug for InterleavedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("InterleavedRange")
            .field("assigned", &state.aggregate.is_some())
            .field("index", &state.index)
            .field("num_elements", &state.num_elements)
            .finish()
    }
}
