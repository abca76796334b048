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

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use strata_agents::{ResourceRegistry, RprimSync, SyncAgent};
use strata_core::telemetry::counters;
use strata_core::{
    BufferSpec, DirtyBits, PrimPath, ResourceConfig, RprimCollection, ScalarType, SceneIndex,
    SyncConfig, UsageHint,
};
use strata_data::{ChangeTracker, InterleavedRange};
use strata_infra::HostBackend;
use strata_lanes::ValueBufferSource;
use strata_telemetry::TelemetryService;

struct Scene(BTreeSet<PrimPath>);

impl SceneIndex for Scene {
    fn is_in_collection(&self, id: &PrimPath, _collection_name: &str) -> bool {
        self.0.contains(id)
    }

    fn rprim_subtree(&self, root: &PrimPath) -> Vec<PrimPath> {
        self.0.iter().filter(|p| p.has_prefix(root)).cloned().collect()
    }
}

/// Uploads one transform per prim into a shared uniform aggregate.
struct TransformDelegate {
    registry: Arc<ResourceRegistry>,
    ranges: BTreeMap<PrimPath, Arc<InterleavedRange>>,
    transforms: BTreeMap<PrimPath, [f32; 16]>,
}

impl TransformDelegate {
    fn spec() -> BufferSpec {
        BufferSpec::new("transform", ScalarType::Float32, 16, 1)
    }
}

impl RprimSync for TransformDelegate {
    fn sync_rprim(&mut self, id: &PrimPath, dirty_bits: DirtyBits) -> DirtyBits {
        if dirty_bits.contains(DirtyBits::DIRTY_TRANSFORM) {
            let range = self
                .ranges
                .entry(id.clone())
                .or_insert_with(|| {
                    self.registry.allocate_uniform_range(
                        "constantPrimvar",
                        &[Self::spec()],
                        UsageHint::EMPTY,
                    )
                })
                .clone();
            let transform = self.transforms.get(id).copied().unwrap_or_default();
            self.registry.add_source(
                &range,
                Arc::new(ValueBufferSource::new(
                    "transform",
                    Self::spec().tuple_type,
                    &[transform],
                )),
            );
        }
        DirtyBits::CLEAN
    }
}

fn translation(x: f32) -> [f32; 16] {
    let mut m = [0.0; 16];
    m[0] = 1.0;
    m[5] = 1.0;
    m[10] = 1.0;
    m[15] = 1.0;
    m[12] = x;
    m
}

fn read_transform(range: &InterleavedRange) -> [f32; 16] {
    bytemuck::pod_read_unaligned(&range.read_data("transform").unwrap())
}

#[test]
fn test_frames_upload_and_collect_removed_prims() {
    // --- 1. ARRANGE ---
    let telemetry = Arc::new(TelemetryService::new());
    let backend = Arc::new(HostBackend::new());
    let registry = Arc::new(ResourceRegistry::new(
        backend.clone(),
        &ResourceConfig::default(),
        telemetry.clone(),
    ));
    let mut tracker = ChangeTracker::new(telemetry.clone());

    let ids: Vec<PrimPath> = (0..3)
        .map(|i| PrimPath::new(format!("/world/cube{i}")))
        .collect();
    for id in &ids {
        tracker.rprim_inserted(id.clone(), DirtyBits::ALL_DIRTY);
    }
    let mut scene = Scene(ids.iter().cloned().collect());
    let mut delegate = TransformDelegate {
        registry: registry.clone(),
        ranges: BTreeMap::new(),
        transforms: ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), translation(i as f32)))
            .collect(),
    };
    let mut agent = SyncAgent::new(
        RprimCollection::new("geometry", "refined"),
        &mut tracker,
        SyncConfig::default(),
        telemetry.clone(),
    )
    .with_resource_registry(registry.clone());

    // --- 2. ACT (frame 1) ---
    let report = agent.run(&mut tracker, &scene, &mut delegate).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(report.synced, 3);
    assert_eq!(report.commit.map(|c| c.sources_resolved), Some(3));
    for (i, id) in ids.iter().enumerate() {
        assert_eq!(read_transform(&delegate.ranges[id]), translation(i as f32));
    }
    assert_eq!(registry.resource_allocation().ubo_size, 3 * 256);

    // --- 2. ACT (frame 2: one prim moves) ---
    delegate.transforms.insert(ids[1].clone(), translation(10.0));
    tracker
        .mark_rprim_dirty(&ids[1], DirtyBits::DIRTY_TRANSFORM)
        .unwrap();
    let report = agent.run(&mut tracker, &scene, &mut delegate).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(report.synced, 1);
    assert!(!report.garbage_collected);
    assert_eq!(read_transform(&delegate.ranges[&ids[1]]), translation(10.0));

    // --- 2. ACT (frame 3: one prim removed) ---
    scene.0.remove(&ids[0]);
    tracker.rprim_removed(&ids[0]);
    delegate.ranges.remove(&ids[0]);
    let report = agent.run(&mut tracker, &scene, &mut delegate).unwrap();

    // --- 3. ASSERT ---
    assert!(report.garbage_collected);
    assert!(!tracker.is_garbage_collection_needed());
    assert_eq!(registry.resource_allocation().ubo_size, 2 * 256);
    assert_eq!(read_transform(&delegate.ranges[&ids[1]]), translation(10.0));
    assert_eq!(read_transform(&delegate.ranges[&ids[2]]), translation(2.0));
    assert_eq!(telemetry.counter(counters::GARBAGE_COLLECTED_UBO), 0);
}
