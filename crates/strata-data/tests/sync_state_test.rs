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


use std::collections::BTreeSet;
use std::sync::Arc;
use strata_core::telemetry::counters;
use strata_core::{DirtyBits, PrimPath, RprimCollection, SceneIndex};
use strata_data::{ChangeTracker, DirtyList, DirtyListState, InstanceRegistry, MeshTopology};
use strata_telemetry::TelemetryService;

struct FlatIndex {
    prims: BTreeSet<PrimPath>,
}

impl SceneIndex for FlatIndex {
    fn is_in_collection(&self, _id: &PrimPath, _collection_name: &str) -> bool {
        true
    }

    fn rprim_subtree(&self, root: &PrimPath) -> Vec<PrimPath> {
        self.prims
            .iter()
            .filter(|p| p.has_prefix(root))
            .cloned()
            .collect()
    }
}

fn scene(paths: &[&str]) -> (ChangeTracker, FlatIndex, Arc<TelemetryService>) {
    let telemetry = Arc::new(TelemetryService::new());
    let mut tracker = ChangeTracker::new(telemetry.clone());
    let mut prims = BTreeSet::new();
    for path in paths {
        tracker.rprim_inserted(PrimPath::new(path), DirtyBits::ALL_DIRTY);
        prims.insert(PrimPath::new(path));
    }
    (tracker, FlatIndex { prims }, telemetry)
}

#[test]
fn test_varying_prim_stays_in_stable_list() {
    // --- 1. ARRANGE ---
    let (mut tracker, index, telemetry) = scene(&["/world/a", "/world/b", "/world/c"]);
    let a = PrimPath::new("/world/a");
    let mut list = DirtyList::new(
        RprimCollection::new("geometry", "refined"),
        &mut tracker,
        telemetry.clone(),
    );
    let initial = list.dirty_rprims(&tracker, &index).to_vec();
    assert_eq!(initial.len(), 3);
    for id in &initial {
        tracker.mark_rprim_clean(id, DirtyBits::CLEAN).unwrap();
    }
    list.clear();

    // --- 2. ACT ---
    let mut per_frame = Vec::new();
    for _ in 0..4 {
        tracker.mark_rprim_dirty(&a, DirtyBits::DIRTY_TRANSFORM).unwrap();
        let dirty = list.dirty_rprims(&tracker, &index).to_vec();
        for id in &dirty {
            tracker.mark_rprim_clean(id, DirtyBits::CLEAN).unwrap();
        }
        per_frame.push(dirty);
        list.clear();
    }

    // --- 3. ASSERT ---
    for dirty in &per_frame {
        assert_eq!(dirty, &vec![a.clone()]);
    }
    assert_eq!(list.state(), DirtyListState::Empty);
    // One initialization build plus one varying build; every later frame reused it.
    assert_eq!(telemetry.counter(counters::DIRTY_LISTS_REBUILT), 2);
    assert!(tracker.rprim_dirty_bits(&a).unwrap().is_varying());
}

#[test]
fn test_clear_twice_yields_nothing() {
    // --- 1. ARRANGE ---
    let (mut tracker, index, telemetry) = scene(&["/a"]);
    let mut list = DirtyList::new(RprimCollection::new("geometry", "hull"), &mut tracker, telemetry);
    for id in list.dirty_rprims(&tracker, &index).to_vec() {
        tracker.mark_rprim_clean(&id, DirtyBits::CLEAN).unwrap();
    }

    // --- 2. ACT ---
    list.clear();
    let first = list.dirty_rprims(&tracker, &index).len();
    list.clear();
    let second = list.dirty_rprims(&tracker, &index).len();

    // --- 3. ASSERT ---
    assert_eq!(first, 0);
    assert_eq!(second, 0);
}

#[test]
fn test_shared_topology_lives_while_held() {
    // --- 1. ARRANGE ---
    let registry: InstanceRegistry<u64, MeshTopology> = InstanceRegistry::new();
    let quad = MeshTopology::new(vec![4], vec![0, 1, 2, 3]);
    let key = quad.compute_hash();

    let first = {
        let mut instance = registry.get_instance(key);
        assert!(instance.is_first_instance());
        let value = Arc::new(quad.clone());
        instance.set_value(value.clone());
        value
    };

    // --- 2. ACT ---
    let second = registry
        .get_instance(key)
        .value()
        .cloned()
        .expect("populated above");
    let remaining_while_held = registry.garbage_collect();
    drop(first);
    let remaining_while_shared = registry.garbage_collect();
    drop(second);
    let remaining_after_release = registry.garbage_collect();

    // --- 3. ASSERT ---
    assert_eq!(remaining_while_held, 1);
    assert_eq!(remaining_while_shared, 1);
    assert_eq!(remaining_after_release, 0);
}
