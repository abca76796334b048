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


//! The striped interleaved aggregate.
//!
//! One device buffer holds a struct per primitive; all fields of a
//! primitive share one row. Many aggregates with the same layout may
//! coexist once one is full.

use super::layout::InterleavedLayout;
use super::range::InterleavedRange;
use super::relocator::BufferRelocator;
use super::staging::StagingQueue;
use parking_lot::Mutex;
use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use strata_core::telemetry::counters;
use strata_core::{
    BufferDescriptor, BufferId, BufferSpec, BufferUsage, ResourceBackend, ResourceError, UsageHint,
};
use strata_telemetry::TelemetryService;

/// Services shared by every aggregate of one memory manager.
#[derive(Debug, Clone)]
pub struct AggregateContext {
    /// Device buffer operations.
    pub backend: Arc<dyn ResourceBackend>,
    /// Host-to-device write batching.
    pub staging: Arc<StagingQueue>,
    /// Counter sink.
    pub telemetry: Arc<TelemetryService>,
}

/// Packing and capacity parameters of an aggregate flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateParams {
    /// Stride is padded to this when non-zero (uniform binding offsets).
    pub buffer_offset_alignment: usize,
    /// Minimum struct alignment.
    pub struct_alignment: usize,
    /// Largest backing buffer in bytes.
    pub max_size: usize,
    /// How the backing buffer is bound.
    pub binding: BufferUsage,
    /// Counter bumped when an aggregate of this flavour is collected.
    pub gc_counter: &'static str,
}

#[derive(Debug, Default)]
struct AggregateState {
    ranges: Vec<Weak<InterleavedRange>>,
    resource: Option<BufferId>,
    size: u64,
    needs_reallocation: bool,
}

/// A device buffer holding one interleaved struct per assigned range.
pub struct StripedInterleavedBuffer {
    role: String,
    usage_hint: UsageHint,
    layout: InterleavedLayout,
    params: AggregateParams,
    max_num_ranges: usize,
    version: AtomicU64,
    needs_compaction: AtomicBool,
    state: Mutex<AggregateState>,
    context: AggregateContext,
}

impl StripedInterleavedBuffer {
    /// Creates an empty aggregate; storage is allocated on first reallocation.
    pub fn new(
        role: impl Into<String>,
        specs: &[BufferSpec],
        usage_hint: UsageHint,
        params: AggregateParams,
        context: AggregateContext,
    ) -> Self {
        let role = role.into();
        let layout =
            InterleavedLayout::new(specs, params.struct_alignment, params.buffer_offset_alignment);
        let max_num_ranges = if layout.stride() > 0 {
            params.max_size / layout.stride()
        } else {
            log::error!("interleaved aggregate '{role}' has an empty layout");
            0
        };
        log::debug!(
            "Create interleaved aggregate '{role}': stride = {}, capacity = {max_num_ranges}",
            layout.stride()
        );

        Self {
            role,
            usage_hint,
            layout,
            params,
            max_num_ranges,
            version: AtomicU64::new(0),
            needs_compaction: AtomicBool::new(false),
            state: Mutex::new(AggregateState::default()),
            context,
        }
    }

    /// Resource role (e.g. `constantPrimvar`, `topology`).
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Usage hint the aggregate was created with.
    pub fn usage_hint(&self) -> UsageHint {
        self.usage_hint
    }

    /// `true` for aggregates whose contents are never updated in place.
    pub fn is_immutable(&self) -> bool {
        self.usage_hint.contains(UsageHint::IMMUTABLE)
    }

    /// The struct layout.
    pub fn layout(&self) -> &InterleavedLayout {
        &self.layout
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.layout.stride()
    }

    /// Specs in layout order.
    pub fn buffer_specs(&self) -> Vec<BufferSpec> {
        self.layout.buffer_specs()
    }

    /// Row capacity.
    pub fn max_num_ranges(&self) -> usize {
        self.max_num_ranges
    }

    /// Counter bumped when this aggregate is collected.
    pub fn gc_counter(&self) -> &'static str {
        self.params.gc_counter
    }

    /// Number of range slots, including ones whose owner has gone away.
    pub fn range_count(&self) -> usize {
        self.state.lock().ranges.len()
    }

    /// Ranges whose owners are still alive, in row order.
    pub fn live_ranges(&self) -> Vec<Arc<InterleavedRange>> {
        self.state
            .lock()
            .ranges
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// The backing device buffer, if allocated.
    pub fn buffer_id(&self) -> Option<BufferId> {
        self.state.lock().resource
    }

    /// Size of the backing buffer in bytes.
    pub fn size(&self) -> u64 {
        self.state.lock().size
    }

    /// Current version.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Bumps the version so consumers rebuild anything cached against it.
    pub fn increment_version(&self) {
        self.version.fetch_add(1, Ordering::AcqRel);
    }

    /// `true` once a range was assigned since the last reallocation.
    pub fn needs_reallocation(&self) -> bool {
        self.state.lock().needs_reallocation
    }

    /// `true` once an assigned range was dropped.
    pub fn needs_compaction(&self) -> bool {
        self.needs_compaction.load(Ordering::Acquire)
    }

    /// Flags the aggregate for compaction on the next garbage collection.
    pub fn set_needs_compaction(&self) {
        self.needs_compaction.store(true, Ordering::Release);
    }

    pub(crate) fn backend(&self) -> &dyn ResourceBackend {
        self.context.backend.as_ref()
    }

    pub(crate) fn staging(&self) -> &StagingQueue {
        &self.context.staging
    }

    pub(crate) fn telemetry(&self) -> &TelemetryService {
        &self.context.telemetry
    }

    /// Appends `range` if there is capacity left.
    pub fn try_assign_range(self: &Arc<Self>, range: &Arc<InterleavedRange>) -> bool {
        {
            let mut state = self.state.lock();
            if state.ranges.len() >= self.max_num_ranges {
                return false;
            }
            state.ranges.push(Arc::downgrade(range));
            state.needs_reallocation = true;
        }
        range.assign(self.clone());
        true
    }

    /// Forgets range slots whose owner has gone away.
    pub fn remove_unused_ranges(&self) {
        self.state
            .lock()
            .ranges
            .retain(|range| range.strong_count() > 0);
    }

    /// Compacts if needed; returns `true` when the aggregate is empty and its
    /// storage has been released.
    pub fn garbage_collect(self: &Arc<Self>) -> Result<bool, ResourceError> {
        if self.needs_compaction() {
            self.remove_unused_ranges();
            let ranges = self.live_ranges();
            self.reallocate(&ranges, self)?;
        }

        if self.range_count() == 0 {
            self.deallocate_resources()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Rebuilds storage for `ranges`, in order.
    ///
    /// `current_owner` holds the bytes the ranges point at today; it differs
    /// from `self` when ranges are being split off into a new aggregate.
    /// Contiguous moves are merged into single device copies.
    pub fn reallocate(
        self: &Arc<Self>,
        ranges: &[Arc<InterleavedRange>],
        current_owner: &Arc<StripedInterleavedBuffer>,
    ) -> Result<(), ResourceError> {
        self.telemetry()
            .increment_counter(counters::VBO_RELOCATED);

        let stride = self.stride();
        let element_count: usize = ranges.iter().map(|range| range.num_elements()).sum();
        let total_size = (element_count * stride) as u64;
        let source = current_owner.buffer_id();

        let mut state = self.state.lock();
        state.ranges = ranges.iter().map(Arc::downgrade).collect();

        let old_resource = state.resource.take();
        let new_resource = if total_size > 0 {
            Some(self.backend().create_buffer(&BufferDescriptor {
                label: Some(Cow::Owned(format!("{} [interleaved]", self.role))),
                size: total_size,
                usage: self.params.binding | BufferUsage::COPY_SRC | BufferUsage::COPY_DST,
                mapped_at_creation: false,
            })?)
        } else {
            None
        };

        let mut index = 0usize;
        match (source, new_resource) {
            (Some(source), Some(destination)) => {
                let mut relocator = BufferRelocator::new(source, destination);
                for range in ranges {
                    if let Some(old_index) = range.element_offset() {
                        relocator.add_range(
                            (old_index * stride) as u64,
                            (index * stride) as u64,
                            (stride * range.num_elements()) as u64,
                        );
                    }
                    range.set_index(self, index);
                    index += range.num_elements();
                }
                let copies = relocator.commit(self.backend())?;
                self.telemetry()
                    .add_counter(counters::COPY_BUFFER_GPU_TO_GPU, copies as u64);
            }
            _ => {
                for range in ranges {
                    range.set_index(self, index);
                    index += range.num_elements();
                }
            }
        }

        if let Some(old) = old_resource {
            self.staging().discard(old);
            self.backend().destroy_buffer(old)?;
        }

        state.resource = new_resource;
        state.size = total_size;
        state.needs_reallocation = false;
        self.needs_compaction.store(false, Ordering::Release);
        drop(state);

        self.increment_version();
        Ok(())
    }

    /// Releases the backing buffer.
    pub fn deallocate_resources(&self) -> Result<(), ResourceError> {
        let mut state = self.state.lock();
        state.size = 0;
        if let Some(resource) = state.resource.take() {
            self.staging().discard(resource);
            self.backend().destroy_buffer(resource)?;
        }
        Ok(())
    }
}

impl Drop for StripedInterleavedBuffer {
    fn drop(&mut self) {
        if let Some(resource) = self.state.get_mut().resource.take() {
            self.context.staging.discard(resource);
            if let Err(err) = self.context.backend.destroy_buffer(resource) {
                log::warn!("Failed to release aggregate '{}': {err}", self.role);
            }
        }
    }
}

impl fmt::Debug for StripedInterleavedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("StripedInterleavedBuffer")
            .field("role", &self.role)
            .field("stride", &self.layout.stride())
            .field("ranges", &state.ranges.len())
            .field("resource", &state.resource)
            .field("size", &state.size)
            .field("version", &self.version())
            .finish()
    }
}
