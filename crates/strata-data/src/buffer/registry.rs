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


//! Aggregation-id keyed lists of striped aggregates.

use super::manager::InterleavedMemoryManager;
use super::range::InterleavedRange;
use super::striped::StripedInterleavedBuffer;
use ahash::AHashMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use strata_core::{BufferSpec, ResourceError, UsageHint};

/// Groups aggregates by layout and hands out ranges from them.
///
/// Ranges are placed into the first aggregate of their layout that has
/// capacity; a new aggregate is appended when all are full.
#[derive(Debug)]
pub struct BufferArrayRegistry {
    manager: InterleavedMemoryManager,
    entries: Mutex<AHashMap<u64, Vec<Arc<StripedInterleavedBuffer>>>>,
}

impl BufferArrayRegistry {
    /// Creates an empty registry allocating through `manager`.
    pub fn new(manager: InterleavedMemoryManager) -> Self {
        Self {
            manager,
            entries: Mutex::new(AHashMap::new()),
        }
    }

    /// The memory manager aggregates are created with.
    pub fn manager(&self) -> &InterleavedMemoryManager {
        &self.manager
    }

    /// Allocates a range for `specs`.
    pub fn allocate_range(
        &self,
        role: &str,
        specs: &[BufferSpec],
        usage_hint: UsageHint,
    ) -> Arc<InterleavedRange> {
        let aggregation_id = self.manager.compute_aggregation_id(specs, usage_hint);
        let range = self.manager.create_buffer_array_range();

        let mut entries = self.entries.lock();
        let aggregates = entries.entry(aggregation_id).or_default();
        if aggregates
            .iter()
            .any(|aggregate| aggregate.try_assign_range(&range))
        {
            return range;
        }

        let aggregate = self.manager.create_buffer_array(role, specs, usage_hint);
        if !aggregate.try_assign_range(&range) {
            log::error!("Fresh aggregate for role '{role}' rejected its first range");
        }
        aggregates.push(aggregate);
        range
    }

    /// Reallocates every aggregate that gained ranges, splitting any that
    /// exceed their capacity into additional aggregates of the same layout.
    pub fn reallocate_all(&self) -> Result<(), ResourceError> {
        let mut entries = self.entries.lock();
        for aggregates in entries.values_mut() {
            let mut cursor = 0;
            while cursor < aggregates.len() {
                let aggregate = aggregates[cursor].clone();
                cursor += 1;
                if !aggregate.needs_reallocation() {
                    continue;
                }

                let max_elements = aggregate.max_num_ranges();
                let mut total = 0usize;
                let mut batch: Vec<Arc<InterleavedRange>> = Vec::new();
                for range in aggregate.live_ranges() {
                    let elements = range.num_elements();
                    if total + elements > max_elements && !batch.is_empty() {
                        let overflow = self.manager.create_buffer_array(
                            aggregate.role(),
                            &aggregate.buffer_specs(),
                            aggregate.usage_hint(),
                        );
                        overflow.reallocate(&batch, &aggregate)?;
                        aggregates.push(overflow);
                        total = 0;
                        batch.clear();
                    }
                    total += elements;
                    batch.push(range);
                }
                aggregate.reallocate(&batch, &aggregate)?;
            }
        }
        Ok(())
    }

    /// Compacts aggregates and drops the empty ones.
    ///
    /// Returns the number of aggregates removed; each removal bumps the
    /// flavour's garbage-collection counter.
    pub fn garbage_collect(&self) -> Result<usize, ResourceError> {
        let mut removed = 0usize;
        let mut entries = self.entries.lock();
        for aggregates in entries.values_mut() {
            let mut kept = Vec::with_capacity(aggregates.len());
            for aggregate in aggregates.drain(..) {
                if aggregate.garbage_collect()? {
                    record_collected(&aggregate);
                    removed += 1;
                } else {
                    kept.push(aggregate);
                }
            }
            *aggregates = kept;
        }
        entries.retain(|_, aggregates| !aggregates.is_empty());
        Ok(removed)
    }

    /// Adds the device bytes of every aggregate to `result` by role and
    /// returns the total.
    pub fn resource_allocation(&self, result: &mut BTreeMap<String, u64>) -> u64 {
        self.entries
            .lock()
            .values()
            .flatten()
            .map(|aggregate| self.manager.resource_allocation(aggregate, result))
            .sum()
    }

    /// Number of live aggregates.
    pub fn buffer_array_count(&self) -> usize {
        self.entries.lock().values().map(Vec::len).sum()
    }

    /// Every live aggregate.
    pub fn buffer_arrays(&self) -> Vec<Arc<StripedInterleavedBuffer>> {
        self.entries.lock().values().flatten().cloned().collect()
    }

    /// Submits staged writes.
    pub fn flush(&self) -> Result<(), ResourceError> {
        self.manager.flush()
    }
}

fn record_collected(aggregate: &StripedInterleavedBuffer) {
    aggregate
        .telemetry()
        .increment_counter(aggregate.gc_counter());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockBackend;
    use crate::buffer::error::RangeError;
    use strata_core::telemetry::counters;
    use strata_core::{ResourceConfig, ScalarType, TupleType};
    use strata_telemetry::TelemetryService;

    fn color() -> Vec<BufferSpec> {
        vec![BufferSpec::new("color", ScalarType::Float32, 4, 1)]
    }

    fn color_tuple() -> TupleType {
        TupleType::new(ScalarType::Float32, 4)
    }

    fn storage_registry(
        max_size: usize,
    ) -> (Arc<MockBackend>, Arc<TelemetryService>, BufferArrayRegistry) {
        let backend = Arc::new(MockBackend::new());
        let telemetry = Arc::new(TelemetryService::new());
        let config = ResourceConfig {
            max_storage_block_size: max_size,
            ..Default::default()
        };
        let manager = InterleavedMemoryManager::storage(backend.clone(), &config, telemetry.clone());
        (backend, telemetry, BufferArrayRegistry::new(manager))
    }

    fn color_bytes(value: f32) -> Vec<u8> {
        bytemuck::cast_slice(&[value; 4]).to_vec()
    }

    #[test]
    fn test_reallocate_assigns_sequential_rows() {
        let (_backend, telemetry, registry) = storage_registry(1024);
        let ranges: Vec<_> = (0..3)
            .map(|_| registry.allocate_range("constant", &color(), UsageHint::EMPTY))
            .collect();
        assert!(ranges.iter().all(|r| r.element_offset().is_none()));

        registry.reallocate_all().unwrap();

        let offsets: Vec<_> = ranges.iter().map(|r| r.element_offset()).collect();
        assert_eq!(offsets, vec![Some(0), Some(1), Some(2)]);
        assert_eq!(ranges[0].aggregate().unwrap().size(), 48);
        assert_eq!(telemetry.counter(counters::VBO_RELOCATED), 1);
        assert_eq!(registry.buffer_array_count(), 1);
    }

    #[test]
    fn test_copy_and_read_through_staging() {
        let (backend, telemetry, registry) = storage_registry(1024);
        let ranges: Vec<_> = (0..3)
            .map(|_| registry.allocate_range("constant", &color(), UsageHint::EMPTY))
            .collect();
        registry.reallocate_all().unwrap();

        for (i, range) in ranges.iter().enumerate() {
            range
                .copy_data("color", color_tuple(), &color_bytes(i as f32))
                .unwrap();
        }
        registry.flush().unwrap();

        // Rows are contiguous, so the three stages merged into one upload.
        assert_eq!(backend.writes(), 1);
        assert_eq!(telemetry.counter(counters::COPY_BUFFER_CPU_TO_GPU), 3);
        assert_eq!(ranges[1].read_data("color").unwrap(), color_bytes(1.0));
    }

    #[test]
    fn test_full_aggregate_starts_a_new_stripe() {
        let (_backend, _telemetry, registry) = storage_registry(32);
        let first = registry.allocate_range("constant", &color(), UsageHint::EMPTY);
        let second = registry.allocate_range("constant", &color(), UsageHint::EMPTY);
        let third = registry.allocate_range("constant", &color(), UsageHint::EMPTY);

        assert_eq!(registry.buffer_array_count(), 2);
        assert!(first.is_same_aggregate(&second));
        assert!(!first.is_same_aggregate(&third));
        assert_eq!(first.max_num_elements(), 2);
    }

    #[test]
    fn test_gc_compacts_and_preserves_data() {
        let (backend, telemetry, registry) = storage_registry(1024);
        let mut ranges: Vec<_> = (0..3)
            .map(|_| registry.allocate_range("constant", &color(), UsageHint::EMPTY))
            .collect();
        registry.reallocate_all().unwrap();
        for (i, range) in ranges.iter().enumerate() {
            range
                .copy_data("color", color_tuple(), &color_bytes(i as f32))
                .unwrap();
        }
        registry.flush().unwrap();
        let version = ranges[0].version();

        drop(ranges.remove(1));
        assert!(ranges[0].aggregate().unwrap().needs_compaction());
        assert_eq!(registry.garbage_collect().unwrap(), 0);

        assert_eq!(ranges[0].element_offset(), Some(0));
        assert_eq!(ranges[1].element_offset(), Some(1));
        assert_eq!(ranges[1].read_data("color").unwrap(), color_bytes(2.0));
        assert_eq!(ranges[0].aggregate().unwrap().size(), 32);
        assert!(ranges[0].version() > version);
        assert_eq!(backend.copies(), 2);
        assert_eq!(telemetry.counter(counters::COPY_BUFFER_GPU_TO_GPU), 2);
    }

    #[test]
    fn test_gc_releases_empty_aggregates() {
        let (backend, telemetry, registry) = storage_registry(1024);
        let range = registry.allocate_range("constant", &color(), UsageHint::EMPTY);
        registry.reallocate_all().unwrap();
        assert_eq!(backend.live_buffers(), 1);

        drop(range);
        assert_eq!(registry.garbage_collect().unwrap(), 1);
        assert_eq!(registry.buffer_array_count(), 0);
        assert_eq!(backend.live_buffers(), 0);
        assert_eq!(telemetry.counter(counters::GARBAGE_COLLECTED_SSBO), 1);
    }

    #[test]
    fn test_copy_data_errors() {
        let (_backend, _telemetry, registry) = storage_registry(1024);
        let range = registry.allocate_range("constant", &color(), UsageHint::EMPTY);
        assert!(matches!(
            range.copy_data("color", color_tuple(), &color_bytes(0.0)),
            Err(RangeError::InvalidRange)
        ));

        registry.reallocate_all().unwrap();
        assert!(matches!(
            range.copy_data("normals", color_tuple(), &color_bytes(0.0)),
            Err(RangeError::MissingResource(name)) if name == "normals"
        ));
        assert!(matches!(
            range.copy_data("color", TupleType::new(ScalarType::Int32, 4), &color_bytes(0.0)),
            Err(RangeError::TypeMismatch { .. })
        ));
        assert!(matches!(
            range.copy_data("color", color_tuple(), &[0u8; 4]),
            Err(RangeError::SizeMismatch { expected: 16, found: 4, .. })
        ));
        assert!(!range.resize(4));
    }

    #[test]
    fn test_aggregation_ids() {
        let backend = Arc::new(MockBackend::new());
        let telemetry = Arc::new(TelemetryService::new());
        let config = ResourceConfig::default();
        let storage = InterleavedMemoryManager::storage(backend.clone(), &config, telemetry.clone());
        let uniform = InterleavedMemoryManager::uniform(backend, &config, telemetry);

        let id = storage.compute_aggregation_id(&color(), UsageHint::EMPTY);
        assert_eq!(id, storage.compute_aggregation_id(&color(), UsageHint::EMPTY));
        assert_ne!(id, storage.compute_aggregation_id(&color(), UsageHint::IMMUTABLE));
        assert_ne!(id, uniform.compute_aggregation_id(&color(), UsageHint::EMPTY));
    }

    #[test]
    fn test_resource_allocation_tallies_roles() {
        let (_backend, _telemetry, registry) = storage_registry(1024);
        let _a = registry.allocate_range("constant", &color(), UsageHint::EMPTY);
        let _b = registry.allocate_range("constant", &color(), UsageHint::EMPTY);
        registry.reallocate_all().unwrap();

        let mut tally = BTreeMap::new();
        assert_eq!(registry.resource_allocation(&mut tally), 32);
        assert_eq!(tally.get("constant"), Some(&32));
    }
}
