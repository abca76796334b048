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

//! The resource registry and its commit loop.

use super::allocation::ResourceAllocation;
use super::error::CommitError;
use super::resolve::resolve_to_fixed_point;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use strata_core::telemetry::counters;
use strata_core::{BufferSpec, ResourceBackend, ResourceConfig, UsageHint};
use strata_data::buffer::BufferArrayRegistry;
use strata_data::mesh::MeshTopology;
use strata_data::{InstanceRegistry, InterleavedMemoryManager, InterleavedRange, RangeError};
use strata_lanes::{
    BufferSource, BufferSourceHandle, Computation, ComputationContext, ComputeQueue,
    CopyComputation, VertexAdjacencyBuilder,
};
use strata_telemetry::TelemetryService;

#[derive(Debug)]
struct PendingSource {
    range: Option<Arc<InterleavedRange>>,
    sources: Vec<BufferSourceHandle>,
}

#[derive(Debug)]
struct PendingComputation {
    range: Arc<InterleavedRange>,
    computation: Arc<dyn Computation>,
    queue: ComputeQueue,
}

/// What a successful [`ResourceRegistry::commit`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Sources that resolved successfully.
    pub sources_resolved: usize,
    /// Sources that settled with a resolve error and were not uploaded.
    pub sources_failed: usize,
    /// Resolution passes run.
    pub iterations: usize,
    /// Computations executed.
    pub computations_committed: usize,
}

/// Owns the uniform and storage aggregates and the queues of pending work.
///
/// Producers register work from any thread with the `add_*` methods. The
/// sync thread then calls [`commit`](Self::commit), which runs in phases:
///
/// 1. resolve every pending source to a fixed point,
/// 2. reallocate aggregates that gained ranges,
/// 3. stage resolved data (and chained buffers) into their ranges,
/// 4. flush staged writes,
/// 5. execute computations in queue order,
/// 6. flush the backend.
pub struct ResourceRegistry {
    backend: Arc<dyn ResourceBackend>,
    telemetry: Arc<TelemetryService>,
    config: ResourceConfig,
    uniform: BufferArrayRegistry,
    storage: BufferArrayRegistry,
    pending_sources: Mutex<Vec<PendingSource>>,
    pending_computations: Mutex<Vec<PendingComputation>>,
    commit_lock: Mutex<()>,
    pub(super) mesh_topologies: InstanceRegistry<u64, MeshTopology>,
    pub(super) vertex_adjacencies: InstanceRegistry<u64, VertexAdjacencyBuilder>,
    pub(super) mesh_index_ranges: InstanceRegistry<(u64, String), InterleavedRange>,
    pub(super) primvar_ranges: InstanceRegistry<u64, InterleavedRange>,
}

impl ResourceRegistry {
    /// Creates a registry allocating through `backend`.
    pub fn new(
        backend: Arc<dyn ResourceBackend>,
        config: &ResourceConfig,
        telemetry: Arc<TelemetryService>,
    ) -> Self {
        let uniform = BufferArrayRegistry::new(InterleavedMemoryManager::uniform(
            backend.clone(),
            config,
            telemetry.clone(),
        ));
        let storage = BufferArrayRegistry::new(InterleavedMemoryManager::storage(
            backend.clone(),
            config,
            telemetry.clone(),
        ));
        log::debug!(
            "ResourceRegistry: ubo {:?}, ssbo {:?}",
            uniform.manager().params(),
            storage.manager().params()
        );
        Self {
            backend,
            telemetry,
            config: config.clone(),
            uniform,
            storage,
            pending_sources: Mutex::new(Vec::new()),
            pending_computations: Mutex::new(Vec::new()),
            commit_lock: Mutex::new(()),
            mesh_topologies: InstanceRegistry::new(),
            vertex_adjacencies: InstanceRegistry::new(),
            mesh_index_ranges: InstanceRegistry::new(),
            primvar_ranges: InstanceRegistry::new(),
        }
    }

    /// The backend device operations go through.
    pub fn backend(&self) -> &Arc<dyn ResourceBackend> {
        &self.backend
    }

    /// The counter sink.
    pub fn telemetry(&self) -> &Arc<TelemetryService> {
        &self.telemetry
    }

    /// The uniform-block aggregates.
    pub fn uniform_buffer_arrays(&self) -> &BufferArrayRegistry {
        &self.uniform
    }

    /// The storage-block aggregates.
    pub fn storage_buffer_arrays(&self) -> &BufferArrayRegistry {
        &self.storage
    }

    // --- Allocation ---

    /// Allocates a uniform-block row for `specs`.
    pub fn allocate_uniform_range(
        &self,
        role: &str,
        specs: &[BufferSpec],
        usage_hint: UsageHint,
    ) -> Arc<InterleavedRange> {
        self.uniform.allocate_range(role, specs, usage_hint)
    }

    /// Allocates a storage-block row for `specs`.
    pub fn allocate_storage_range(
        &self,
        role: &str,
        specs: &[BufferSpec],
        usage_hint: UsageHint,
    ) -> Arc<InterleavedRange> {
        self.storage.allocate_range(role, specs, usage_hint)
    }

    /// Returns a uniform-block range able to receive `updated_or_added`.
    ///
    /// See [`update_storage_range`](Self::update_storage_range).
    pub fn update_uniform_range(
        &self,
        role: &str,
        current: Option<&Arc<InterleavedRange>>,
        updated_or_added: &[BufferSpec],
        removed: &[BufferSpec],
        usage_hint: UsageHint,
    ) -> Arc<InterleavedRange> {
        self.update_range(
            &self.uniform,
            role,
            current,
            updated_or_added,
            removed,
            usage_hint,
        )
    }

    /// Returns a storage-block range able to receive `updated_or_added`.
    ///
    /// The current range is kept when nothing is removed, the usage hint is
    /// unchanged, every updated spec already exists, and the range is not
    /// immutable. Otherwise a new range is allocated with the merged specs,
    /// the channels that are kept but not updated are queued for a device
    /// copy out of the current range, and the current range's version is
    /// bumped so anything drawing from it rebuilds.
    pub fn update_storage_range(
        &self,
        role: &str,
        current: Option<&Arc<InterleavedRange>>,
        updated_or_added: &[BufferSpec],
        removed: &[BufferSpec],
        usage_hint: UsageHint,
    ) -> Arc<InterleavedRange> {
        self.update_range(
            &self.storage,
            role,
            current,
            updated_or_added,
            removed,
            usage_hint,
        )
    }

    fn update_range(
        &self,
        registry: &BufferArrayRegistry,
        role: &str,
        current: Option<&Arc<InterleavedRange>>,
        updated_or_added: &[BufferSpec],
        removed: &[BufferSpec],
        usage_hint: UsageHint,
    ) -> Arc<InterleavedRange> {
        let current = match current {
            Some(range) if range.is_valid() => range,
            _ => {
                if !removed.is_empty() {
                    log::error!("update of role '{role}': removed specs given for a new range");
                }
                return registry.allocate_range(role, updated_or_added, usage_hint);
            }
        };

        let current_specs = current.buffer_specs();
        let immutable_update = current.is_immutable() && !updated_or_added.is_empty();
        let needs_migration = immutable_update
            || current.usage_hint() != usage_hint
            || !removed.is_empty()
            || !BufferSpec::is_subset(updated_or_added, &current_specs);
        if !needs_migration {
            return current.clone();
        }

        let new_specs = BufferSpec::compute_union(
            updated_or_added,
            &BufferSpec::compute_difference(&current_specs, removed),
        );
        let new_range = registry.allocate_range(role, &new_specs, usage_hint);

        for spec in BufferSpec::compute_difference(&new_specs, updated_or_added) {
            log::trace!("migrating '{}' for role '{role}'", spec.name);
            self.add_computation(
                &new_range,
                Arc::new(CopyComputation::new(current.clone(), spec)),
                ComputeQueue::Zero,
            );
        }

        current.increment_version();
        self.telemetry
            .increment_counter(counters::BUFFER_ARRAY_RANGE_MIGRATED);
        new_range
    }

    // --- Pending work ---

    /// Queues `sources` for upload into `range`.
    ///
    /// Invalid sources are dropped with an error; the rest are kept.
    pub fn add_sources(&self, range: &Arc<InterleavedRange>, sources: Vec<BufferSourceHandle>) {
        if sources.is_empty() {
            log::error!("add_sources: sources list is empty");
            return;
        }
        if !range.is_valid() {
            log::error!("add_sources: range is invalid");
            return;
        }

        let sources: Vec<BufferSourceHandle> = sources
            .into_iter()
            .filter(|source| {
                let valid = source.check_valid();
                if !valid {
                    log::error!("source buffer for '{}' is invalid", source.name());
                }
                valid
            })
            .collect();
        if sources.is_empty() {
            return;
        }

        self.pending_sources.lock().push(PendingSource {
            range: Some(range.clone()),
            sources,
        });
    }

    /// Queues one source for upload into `range`.
    pub fn add_source(&self, range: &Arc<InterleavedRange>, source: BufferSourceHandle) {
        self.add_sources(range, vec![source]);
    }

    /// Queues a source that is only resolved, never uploaded (e.g. an
    /// adjacency table read back by another source).
    pub fn add_standalone_source(&self, source: BufferSourceHandle) {
        if !source.check_valid() {
            log::error!("source buffer for '{}' is invalid", source.name());
            return;
        }
        self.pending_sources.lock().push(PendingSource {
            range: None,
            sources: vec![source],
        });
    }

    /// Queues a computation writing into `range`.
    pub fn add_computation(
        &self,
        range: &Arc<InterleavedRange>,
        computation: Arc<dyn Computation>,
        queue: ComputeQueue,
    ) {
        if !range.is_valid() {
            log::error!("add_computation: range is invalid");
            return;
        }
        self.pending_computations.lock().push(PendingComputation {
            range: range.clone(),
            computation,
            queue,
        });
    }

    /// Number of source groups waiting for the next commit.
    pub fn pending_source_count(&self) -> usize {
        self.pending_sources.lock().len()
    }

    /// Number of computations waiting for the next commit.
    pub fn pending_computation_count(&self) -> usize {
        self.pending_computations.lock().len()
    }

    // --- Commit ---

    /// Resolves, uploads, and computes everything queued since the last commit.
    ///
    /// Pending work is consumed even when the commit fails.
    pub fn commit(&self) -> Result<CommitReport, CommitError> {
        let _commit = self.commit_lock.lock();
        let pending_sources = std::mem::take(&mut *self.pending_sources.lock());
        let mut pending_computations = std::mem::take(&mut *self.pending_computations.lock());

        // 1. Resolve.
        let all_sources: Vec<BufferSourceHandle> = pending_sources
            .iter()
            .flat_map(|pending| pending.sources.iter().cloned())
            .collect();
        let outcome = resolve_to_fixed_point(
            &all_sources,
            self.config.max_resolve_iterations,
            self.config.parallel_resolve,
        )?;
        let sources_resolved = all_sources.iter().filter(|s| s.is_resolved()).count();
        let sources_failed = all_sources.len() - sources_resolved;
        self.telemetry
            .add_counter(counters::BUFFER_SOURCES_RESOLVED, sources_resolved as u64);

        // 2. Reallocate.
        self.uniform.reallocate_all()?;
        self.storage.reallocate_all()?;

        // 3. Copy.
        for pending in &pending_sources {
            let Some(range) = &pending.range else {
                continue;
            };
            for source in &pending.sources {
                self.copy_source(range, source)?;
            }
        }

        // 4. Flush staged writes so computations see them.
        self.uniform.flush()?;
        self.storage.flush()?;

        // 5. Computations, queue by queue.
        pending_computations.sort_by_key(|pending| pending.queue);
        let context = ComputationContext {
            backend: self.backend.as_ref(),
            telemetry: self.telemetry.as_ref(),
        };
        let mut computations_committed = 0;
        for pending in &pending_computations {
            if !pending.computation.is_valid() {
                log::error!("skipping invalid computation {:?}", pending.computation);
                continue;
            }
            match pending.computation.execute(&pending.range, &context) {
                Ok(()) => {
                    computations_committed += 1;
                    self.telemetry
                        .increment_counter(counters::COMPUTATIONS_COMMITTED);
                }
                Err(RangeError::Resource(err)) => return Err(err.into()),
                Err(err) => log::error!("computation {:?} failed: {err}", pending.computation),
            }
        }

        // 6. Submit.
        self.backend.flush()?;

        let report = CommitReport {
            sources_resolved,
            sources_failed,
            iterations: outcome.iterations,
            computations_committed,
        };
        log::debug!("commit: {report:?}");
        Ok(report)
    }

    fn copy_source(
        &self,
        range: &InterleavedRange,
        source: &BufferSourceHandle,
    ) -> Result<(), CommitError> {
        if source.has_resolve_error() {
            log::warn!("'{}' failed to resolve and is not uploaded", source.name());
            return Ok(());
        }
        if let Some(data) = source.data() {
            match range.copy_data(source.name(), source.tuple_type(), data) {
                Ok(()) => {}
                Err(RangeError::Resource(err)) => return Err(err.into()),
                Err(err) => log::error!("upload of '{}' skipped: {err}", source.name()),
            }
        }
        for chained in source.chained_buffers() {
            self.copy_source(range, &chained)?;
        }
        Ok(())
    }

    // --- Garbage collection and tallies ---

    /// Releases unreferenced instances, then compacts and frees aggregates.
    ///
    /// Instance registries go first since their entries hold ranges.
    pub fn garbage_collect(&self) -> Result<(), CommitError> {
        let count = self.mesh_topologies.garbage_collect();
        self.telemetry
            .set_counter(counters::INST_MESH_TOPOLOGY, count as u64);

        let count = self.vertex_adjacencies.garbage_collect();
        self.telemetry
            .set_counter(counters::INST_VERTEX_ADJACENCY, count as u64);

        let count = self.mesh_index_ranges.garbage_collect();
        self.telemetry
            .set_counter(counters::INST_MESH_TOPOLOGY_RANGE, count as u64);

        let count = self.primvar_ranges.garbage_collect();
        self.telemetry
            .set_counter(counters::INST_PRIMVAR_RANGE, count as u64);

        let released = self.uniform.garbage_collect()? + self.storage.garbage_collect()?;
        log::debug!("garbage collection released {released} aggregate(s)");
        self.backend.flush()?;
        Ok(())
    }

    /// Tallies device bytes per role and per flavour.
    pub fn resource_allocation(&self) -> ResourceAllocation {
        let mut roles = BTreeMap::new();
        let ubo_size = self.uniform.resource_allocation(&mut roles);
        let ssbo_size = self.storage.resource_allocation(&mut roles);
        let gpu_memory_used = ubo_size + ssbo_size;
        self.telemetry
            .set_counter(counters::GPU_MEMORY_USED, gpu_memory_used);
        ResourceAllocation {
            roles,
            ubo_size,
            ssbo_size,
            gpu_memory_used,
        }
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("uniform", &self.uniform.buffer_array_count())
            .field("storage", &self.storage.buffer_array_count())
            .field("pending_sources", &self.pending_source_count())
            .field("pending_computations", &self.pending_computation_count())
            .finish()
    }
}
