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

//! Device-side work executed after buffer sources have been uploaded.

mod copy;

pub use copy::CopyComputation;

use std::fmt::Debug;
use strata_core::{BufferSpec, ResourceBackend};
use strata_data::{InterleavedRange, RangeError};
use strata_telemetry::TelemetryService;

/// Ordered queues computations are executed in.
///
/// Every computation of a lower queue runs before any of a higher one;
/// within a queue, registration order is kept. Copies of migrated channels
/// go to [`ComputeQueue::Zero`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComputeQueue {
    /// First queue.
    #[default]
    Zero,
    /// Second queue.
    One,
    /// Third queue.
    Two,
    /// Fourth queue.
    Three,
}

/// Services available to a computation while it executes.
#[derive(Debug, Clone, Copy)]
pub struct ComputationContext<'a> {
    /// Backend issuing the device operations.
    pub backend: &'a dyn ResourceBackend,
    /// Counter sink.
    pub telemetry: &'a TelemetryService,
}

/// A unit of device work writing into a destination range.
///
/// Computations run in queue order once every buffer source of the commit
/// has been uploaded and every aggregate reallocated.
pub trait Computation: Send + Sync + Debug {
    /// Runs the computation against `range`.
    fn execute(
        &self,
        range: &InterleavedRange,
        context: &ComputationContext<'_>,
    ) -> Result<(), RangeError>;

    /// Number of elements written into the destination range.
    fn num_output_elements(&self) -> usize;

    /// Appends the specs of the channels this computation writes.
    fn add_buffer_specs(&self, specs: &mut Vec<BufferSpec>);

    /// `false` if the computation cannot run.
    fn is_valid(&self) -> bool {
        true
    }
}
