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


//! Interleaved memory managers for uniform and storage aggregates.

use super::range::InterleavedRange;
use super::staging::StagingQueue;
use super::striped::{AggregateContext, AggregateParams, StripedInterleavedBuffer};
use std::collections::BTreeMap;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::Arc;
use strata_core::telemetry::counters;
use strata_core::{
    BackendCapabilities, BufferSpec, BufferUsage, ResourceBackend, ResourceConfig, ResourceError,
    UsageHint,
};
use strata_telemetry::TelemetryService;

/// Which binding model a manager's aggregates are packed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterleavedFlavor {
    /// Uniform blocks: 16-byte struct alignment, padded to the binding offset alignment.
    Uniform,
    /// Storage blocks: natural struct alignment, no binding padding.
    Storage,
}

/// Creates striped interleaved aggregates of one flavour and owns their
/// shared staging queue.
#[derive(Debug)]
pub struct InterleavedMemoryManager {
    flavor: InterleavedFlavor,
    params: AggregateParams,
    context: AggregateContext,
}

impl InterleavedMemoryManager {
    /// Creates the uniform-block manager.
    ///
    /// Limits are the stricter of `config` and the backend's capabilities.
    pub fn uniform(
        backend: Arc<dyn ResourceBackend>,
        config: &ResourceConfig,
        telemetry: Arc<TelemetryService>,
    ) -> Self {
        let caps = backend.capabilities();
        let params = AggregateParams {
            buffer_offset_alignment: (config.uniform_buffer_offset_alignment as u64)
                .max(caps.uniform_buffer_offset_alignment) as usize,
            struct_alignment: std::mem::size_of::<f32>() * 4,
            max_size: limit(config.max_uniform_block_size, caps.max_uniform_block_size),
            binding: BufferUsage::UNIFORM,
            gc_counter: counters::GARBAGE_COLLECTED_UBO,
        };
        Self::with_params(InterleavedFlavor::Uniform, params, backend, config, telemetry)
    }

    /// Creates the storage-block manager.
    pub fn storage(
        backend: Arc<dyn ResourceBackend>,
        config: &ResourceConfig,
        telemetry: Arc<TelemetryService>,
    ) -> Self {
        let caps: BackendCapabilities = backend.capabilities();
        let params = AggregateParams {
            buffer_offset_alignment: 0,
            struct_alignment: 0,
            max_size: limit(config.max_storage_block_size, caps.max_storage_block_size),
            binding: BufferUsage::STORAGE,
            gc_counter: counters::GARBAGE_COLLECTED_SSBO,
        };
        Self::with_params(InterleavedFlavor::Storage, params, backend, config, telemetry)
    }

    fn with_params(
        flavor: InterleavedFlavor,
        params: AggregateParams,
        backend: Arc<dyn ResourceBackend>,
        config: &ResourceConfig,
        telemetry: Arc<TelemetryService>,
    ) -> Self {
        let staging = Arc::new(StagingQueue::new(
            backend.clone(),
            config.staging_queue_threshold,
        ));
        Self {
            flavor,
            params,
            context: AggregateContext {
                backend,
                staging,
                telemetry,
            },
        }
    }

    /// The binding model.
    pub fn flavor(&self) -> InterleavedFlavor {
        self.flavor
    }

    /// Packing and capacity parameters.
    pub fn params(&self) -> AggregateParams {
        self.params
    }

    /// Creates an empty aggregate for `specs`.
    pub fn create_buffer_array(
        &self,
        role: &str,
        specs: &[BufferSpec],
        usage_hint: UsageHint,
    ) -> Arc<StripedInterleavedBuffer> {
        Arc::new(StripedInterleavedBuffer::new(
            role,
            specs,
            usage_hint,
            self.params,
            self.context.clone(),
        ))
    }

    /// Creates an unassigned range.
    pub fn create_buffer_array_range(&self) -> Arc<InterleavedRange> {
        Arc::new(InterleavedRange::new())
    }

    /// Key under which aggregates with compatible layouts are grouped.
    pub fn compute_aggregation_id(&self, specs: &[BufferSpec], usage_hint: UsageHint) -> u64 {
        let mut hasher = aggregation_hash_state().build_hasher();
        self.flavor.hash(&mut hasher);
        for spec in specs {
            spec.hash(&mut hasher);
        }
        usage_hint.bits().hash(&mut hasher);
        hasher.finish()
    }

    /// Adds the aggregate's device bytes to `result` under its role and
    /// returns them.
    pub fn resource_allocation(
        &self,
        aggregate: &StripedInterleavedBuffer,
        result: &mut BTreeMap<String, u64>,
    ) -> u64 {
        let size = aggregate.size();
        *result.entry(aggregate.role().to_owned()).or_default() += size;
        size
    }

    /// Submits writes staged by ranges of this manager.
    pub fn flush(&self) -> Result<(), ResourceError> {
        self.context.staging.flush()
    }

    /// The staging queue shared by this manager's aggregates.
    pub fn staging(&self) -> &Arc<StagingQueue> {
        &self.context.staging
    }
}

fn limit(configured: usize, capability: u64) -> usize {
    (configured as u64).min(capability) as usize
}

fn aggregation_hash_state() -> ahash::RandomState {
    ahash::RandomState::with_seeds(
        0x696e_7465_726c_6561,
        0x7665_6400_0000_0002,
        0xa409_3822_299f_31d0,
        0x082e_fa98_ec4e_6c89,
    )
}
