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

//! Buffer sources: host-side producers of named, typed bytes.
//!
//! Resolution is cooperative polling. [`BufferSource::resolve`] never blocks:
//! a source whose inputs are not ready returns `false` and is retried on the
//! next pass of the commit loop.

mod chained;
mod derived;
mod resolve_state;
mod value;

pub use chained::ChainedBufferSource;
pub use derived::DerivedBufferSource;
pub use resolve_state::ResolveState;
pub use value::ValueBufferSource;

use std::fmt::Debug;
use std::sync::Arc;
use strata_core::{BufferSpec, TupleType};

/// A shared handle onto a buffer source.
pub type BufferSourceHandle = Arc<dyn BufferSource>;

/// A producer of one named data channel.
pub trait BufferSource: Send + Sync + Debug {
    /// Channel name the bytes are uploaded to.
    fn name(&self) -> &str;

    /// Element type of the produced data.
    fn tuple_type(&self) -> TupleType;

    /// The produced bytes, once resolved.
    fn data(&self) -> Option<&[u8]>;

    /// Attempts to produce the data. Returns `true` once the source has
    /// settled (resolved or failed) and `false` if it must be retried.
    fn resolve(&self) -> bool;

    /// The source's resolution state.
    fn state(&self) -> &ResolveState;

    /// Number of elements in the produced data.
    fn num_elements(&self) -> usize {
        let element_size = self.tuple_type().byte_size().max(1);
        self.data().map_or(0, |data| data.len() / element_size)
    }

    /// `true` once the data is available.
    fn is_resolved(&self) -> bool {
        self.state().is_resolved()
    }

    /// `true` if resolution failed. The source will never produce data.
    fn has_resolve_error(&self) -> bool {
        self.state().has_resolve_error()
    }

    /// Appends the specs of the channels this source writes.
    fn add_buffer_specs(&self, specs: &mut Vec<BufferSpec>) {
        specs.push(BufferSpec::from_tuple(self.name(), self.tuple_type()));
    }

    /// Follow-up sources produced alongside this one and committed with it.
    fn chained_buffers(&self) -> Vec<BufferSourceHandle> {
        Vec::new()
    }

    /// `false` if the source can never resolve (no name or an empty tuple).
    fn check_valid(&self) -> bool {
        let tuple = self.tuple_type();
        !self.name().is_empty() && tuple.components > 0 && tuple.count > 0
    }
}

/// Decodes the data of a resolved source as a vector of `T`.
///
/// Returns `None` if the source has no data yet or the byte length is not a
/// multiple of `size_of::<T>()`.
pub fn collect_values<T: bytemuck::Pod>(source: &dyn BufferSource) -> Option<Vec<T>> {
    let data = source.data()?;
    if data.len() % std::mem::size_of::<T>() != 0 {
        return None;
    }
    Some(bytemuck::pod_collect_to_vec(data))
}

/// Readiness of a set of input sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InputStatus {
    Ready,
    Pending,
    Failed,
}

pub(crate) fn input_status<'a>(inputs: impl IntoIterator<Item = &'a BufferSourceHandle>) -> InputStatus {
    let mut status = InputStatus::Ready;
    for input in inputs {
        if input.has_resolve_error() {
            return InputStatus::Failed;
        }
        if !input.is_resolved() {
            status = InputStatus::Pending;
        }
    }
    status
}
