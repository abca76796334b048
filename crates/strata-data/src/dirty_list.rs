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


//! Cached, root-filtered work lists over the change tracker.
//!
//! A dirty list moves between three states. The first query after a
//! membership change builds the conservative initialization list (every
//! matching primitive with any bit set). That build records the collection
//! version but leaves the cached varying version one behind, so the following
//! query rebuilds from the varying primitives only. From then on, a list is
//! rebuilt only when the varying state version moves; otherwise the cached ids
//! are reused as is.

use std::sync::Arc;
use strata_core::telemetry::counters::DIRTY_LISTS_REBUILT;
use strata_core::{DirtyBits, PrimPath, RprimCollection, SceneIndex};
use strata_telemetry::TelemetryService;

use crate::change_tracker::ChangeTracker;

/// Root edits touching more roots than this fall back to a full rebuild.
const MAX_EDITED_ROOTS: usize = 100;

/// Which list the cached ids currently hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirtyListState {
    /// Every matching primitive with any bit set, built after a membership change.
    Initialization,
    /// Only the primitives flagged varying.
    StableVarying,
    /// Cleared; nothing pending until the scene changes again.
    Empty,
}

/// The ordered set of primitive ids of one collection that may need a sync.
#[derive(Debug)]
pub struct DirtyList {
    collection: RprimCollection,
    collection_version: u64,
    varying_state_version: u64,
    scene_state_version: u64,
    dirty_ids: Vec<PrimPath>,
    kind: DirtyListState,
    is_empty: bool,
    telemetry: Arc<TelemetryService>,
}

impl DirtyList {
    /// Creates a dirty list for `collection`, registering the collection with the tracker.
    ///
    /// The cached versions start one behind the tracker so the first query
    /// builds the initialization list.
    pub fn new(
        collection: RprimCollection,
        tracker: &mut ChangeTracker,
        telemetry: Arc<TelemetryService>,
    ) -> Self {
        tracker.add_collection(collection.name());
        Self {
            collection_version: tracker.collection_version(collection.name()) - 1,
            varying_state_version: tracker.varying_state_version() - 1,
            scene_state_version: tracker.scene_state_version() - 1,
            collection,
            dirty_ids: Vec::new(),
            kind: DirtyListState::Initialization,
            is_empty: false,
            telemetry,
        }
    }

    /// The collection this list filters by.
    pub fn collection(&self) -> &RprimCollection {
        &self.collection
    }

    /// The state the cached ids were last built in.
    pub fn state(&self) -> DirtyListState {
        if self.is_empty {
            DirtyListState::Empty
        } else {
            self.kind
        }
    }

    /// Returns the sorted ids that need a dirty-bit check this frame.
    ///
    /// Ids in the returned list may already be clean; callers are expected
    /// to skip those.
    pub fn dirty_rprims(&mut self, tracker: &ChangeTracker, index: &dyn SceneIndex) -> &[PrimPath] {
        let scene_state_version = tracker.scene_state_version();
        if self.is_empty && self.scene_state_version == scene_state_version {
            return &[];
        }

        let collection_version = tracker.collection_version(self.collection.name());
        let varying_state_version = tracker.varying_state_version();

        if self.collection_version != collection_version {
            log::debug!(
                "DirtyList '{}': membership changed, building initialization list",
                self.collection.name()
            );
            self.rebuild(tracker, index, |bits| !bits.is_empty());
            self.kind = DirtyListState::Initialization;
            self.collection_version = collection_version;
            self.varying_state_version = varying_state_version - 1;
        } else if self.varying_state_version != varying_state_version {
            log::debug!(
                "DirtyList '{}': varying state changed, building varying list",
                self.collection.name()
            );
            self.rebuild(tracker, index, |bits| bits.is_varying());
            self.kind = DirtyListState::StableVarying;
            self.varying_state_version = varying_state_version;
        }
        // Otherwise the cached ids are still the right set to check.

        self.is_empty = false;
        self.scene_state_version = scene_state_version;
        &self.dirty_ids
    }

    /// Marks the list empty until the scene state version moves.
    ///
    /// The cached ids are kept so the next dirty pass can reuse them.
    pub fn clear(&mut self) {
        self.is_empty = true;
    }

    /// Drops every cached id that is no longer flagged varying.
    pub fn prune_to_varying(&mut self, tracker: &ChangeTracker) {
        let before = self.dirty_ids.len();
        self.dirty_ids.retain(|id| {
            tracker
                .rprim_dirty_bits(id)
                .map(|bits| bits.is_varying())
                .unwrap_or(false)
        });
        log::debug!(
            "DirtyList '{}': pruned {} non-varying ids",
            self.collection.name(),
            before - self.dirty_ids.len()
        );
    }

    /// Patches the cached ids for a collection whose root paths changed.
    ///
    /// Returns `false` when the edit cannot be applied incrementally: the name
    /// or repr differ, the cached list is stale, too many roots changed, or
    /// an added root and a removed root are nested in each other. The list is
    /// left untouched in that case.
    pub fn apply_edit(
        &mut self,
        new_collection: &RprimCollection,
        tracker: &ChangeTracker,
        index: &dyn SceneIndex,
    ) -> bool {
        if new_collection.name() != self.collection.name()
            || new_collection.repr_selector() != self.collection.repr_selector()
        {
            return false;
        }
        if self.collection_version != tracker.collection_version(self.collection.name()) {
            return false;
        }

        let old_roots = self.collection.root_paths();
        let new_roots = new_collection.root_paths();
        let added: Vec<&PrimPath> = new_roots.iter().filter(|r| !old_roots.contains(r)).collect();
        let removed: Vec<&PrimPath> = old_roots.iter().filter(|r| !new_roots.contains(r)).collect();

        if added.len() + removed.len() > MAX_EDITED_ROOTS {
            return false;
        }
        let nested = added
            .iter()
            .any(|a| removed.iter().any(|r| a.has_prefix(r) || r.has_prefix(a)));
        if nested {
            return false;
        }

        if !removed.is_empty() {
            self.dirty_ids
                .retain(|id| !removed.iter().any(|root| id.has_prefix(root)));
        }

        if !added.is_empty() {
            let varying_only = self.varying_state_version == tracker.varying_state_version();
            let name = new_collection.name();
            for root in &added {
                for id in index.rprim_subtree(root) {
                    let Ok(bits) = tracker.rprim_dirty_bits(&id) else {
                        continue;
                    };
                    let wanted = if varying_only {
                        bits.is_varying()
                    } else {
                        !bits.is_empty()
                    };
                    if wanted && index.is_in_collection(&id, name) {
                        self.dirty_ids.push(id);
                    }
                }
            }
            self.dirty_ids.sort();
            self.dirty_ids.dedup();
        }

        self.collection = new_collection.clone();
        true
    }

    /// Switches to `new_collection`, patching in place when possible.
    ///
    /// The collection is marked dirty on the tracker either way. When the
    /// incremental edit is rejected the next query rebuilds the
    /// initialization list.
    pub fn update_collection(
        &mut self,
        new_collection: RprimCollection,
        tracker: &mut ChangeTracker,
        index: &dyn SceneIndex,
    ) {
        let applied = self.apply_edit(&new_collection, tracker, index);
        let name = new_collection.name().to_owned();
        tracker.add_collection(&name);
        if let Err(e) = tracker.mark_collection_dirty(&name) {
            log::warn!("Failed to mark collection '{name}' dirty: {e}");
        }

        if applied {
            self.collection_version = tracker.collection_version(&name);
        } else {
            log::debug!("DirtyList '{name}': edit rejected, reinitializing");
            self.collection = new_collection;
            self.collection_version = tracker.collection_version(&name) - 1;
            self.varying_state_version = tracker.varying_state_version() - 1;
        }
        // Force the next query past the empty-list shortcut.
        self.scene_state_version = tracker.scene_state_version() - 1;
    }

    fn rebuild(
        &mut self,
        tracker: &ChangeTracker,
        index: &dyn SceneIndex,
        wanted: impl Fn(DirtyBits) -> bool,
    ) {
        self.telemetry.increment_counter(DIRTY_LISTS_REBUILT);
        self.dirty_ids.clear();

        let roots = self.collection.root_paths();
        if roots.is_empty() {
            return;
        }
        let name = self.collection.name();
        let candidates = tracker
            .rprims()
            .filter(|(_, bits)| wanted(*bits))
            .map(|(id, _)| id);

        if self.collection.is_absolute_root() {
            self.dirty_ids.extend(
                candidates
                    .filter(|id| index.is_in_collection(id, name))
                    .cloned(),
            );
        } else {
            let mut root = 0usize;
            for id in candidates {
                if under_root(id, roots, &mut root) && index.is_in_collection(id, name) {
                    self.dirty_ids.push(id.clone());
                }
            }
        }
        log::trace!(
            "DirtyList '{}': rebuilt with {} ids",
            name,
            self.dirty_ids.len()
        );
    }
}

/// Sorted-merge prefix test of `id` against normalized, sorted `roots`.
///
/// `cursor` remembers the last matching root: ids arrive sorted, so most of
/// them fall under the same root as their predecessor.
fn under_root(id: &PrimPath, roots: &[PrimPath], cursor: &mut usize) -> bool {
    if let Some(root) = roots.get(*cursor) {
        if id.has_prefix(root) {
            return true;
        }
    }
    // Ambiguous: the only candidate ancestor is the greatest root not after `id`.
    match roots.binary_search(id) {
        Ok(i) => {
            *cursor = i;
            true
        }
        Err(0) => false,
        Err(i) => {
            if id.has_prefix(&roots[i - 1]) {
                *cursor = i - 1;
                true
            } else {
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[derive(Default)]
    struct TestIndex {
        prims: BTreeSet<PrimPath>,
        excluded: BTreeSet<PrimPath>,
    }

    impl SceneIndex for TestIndex {
        fn is_in_collection(&self, id: &PrimPath, _collection_name: &str) -> bool {
            !self.excluded.contains(id)
        }

        fn rprim_subtree(&self, root: &PrimPath) -> Vec<PrimPath> {
            self.prims
                .iter()
                .filter(|p| p.has_prefix(root))
                .cloned()
                .collect()
        }
    }

    fn setup(paths: &[&str]) -> (ChangeTracker, TestIndex, Arc<TelemetryService>) {
        let telemetry = Arc::new(TelemetryService::new());
        let mut tracker = ChangeTracker::new(telemetry.clone());
        let mut index = TestIndex::default();
        for p in paths {
            tracker.rprim_inserted(PrimPath::new(p), DirtyBits::ALL_DIRTY);
            index.prims.insert(PrimPath::new(p));
        }
        (tracker, index, telemetry)
    }

    fn ids(list: &[PrimPath]) -> Vec<&str> {
        list.iter().map(|p| p.as_str()).collect()
    }

    fn clean_all(tracker: &mut ChangeTracker, list: &[PrimPath]) {
        for id in list {
            tracker.mark_rprim_clean(id, DirtyBits::CLEAN).unwrap();
        }
    }

    #[test]
    fn test_first_query_builds_initialization_list() {
        let (mut tracker, index, telemetry) = setup(&["/b", "/a", "/a/c"]);
        let mut list = DirtyList::new(
            RprimCollection::new("geometry", "hull"),
            &mut tracker,
            telemetry.clone(),
        );

        let dirty = list.dirty_rprims(&tracker, &index).to_vec();
        assert_eq!(ids(&dirty), vec!["/a", "/a/c", "/b"]);
        assert_eq!(list.state(), DirtyListState::Initialization);
        assert_eq!(telemetry.counter(DIRTY_LISTS_REBUILT), 1);
    }

    #[test]
    fn test_second_query_switches_to_varying_list() {
        let (mut tracker, index, telemetry) = setup(&["/a", "/b"]);
        let mut list = DirtyList::new(RprimCollection::new("geometry", "hull"), &mut tracker, telemetry);

        let dirty = list.dirty_rprims(&tracker, &index).to_vec();
        clean_all(&mut tracker, &dirty);

        // Nothing is varying yet: the follow-up build is the (empty) varying list.
        assert!(list.dirty_rprims(&tracker, &index).is_empty());
        assert_eq!(list.state(), DirtyListState::StableVarying);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (mut tracker, index, telemetry) = setup(&["/a"]);
        let mut list = DirtyList::new(RprimCollection::new("geometry", "hull"), &mut tracker, telemetry);
        let dirty = list.dirty_rprims(&tracker, &index).to_vec();
        clean_all(&mut tracker, &dirty);

        list.clear();
        assert!(list.dirty_rprims(&tracker, &index).is_empty());
        list.clear();
        assert!(list.dirty_rprims(&tracker, &index).is_empty());
        assert_eq!(list.state(), DirtyListState::Empty);
    }

    #[test]
    fn test_varying_list_is_reused_across_stable_frames() {
        let (mut tracker, index, telemetry) = setup(&["/a", "/b"]);
        let a = PrimPath::new("/a");
        let mut list = DirtyList::new(
            RprimCollection::new("geometry", "hull"),
            &mut tracker,
            telemetry.clone(),
        );
        let dirty = list.dirty_rprims(&tracker, &index).to_vec();
        clean_all(&mut tracker, &dirty);
        list.clear();

        for _ in 0..3 {
            tracker.mark_rprim_dirty(&a, DirtyBits::DIRTY_POINTS).unwrap();
            let dirty = list.dirty_rprims(&tracker, &index).to_vec();
            assert_eq!(ids(&dirty), vec!["/a"]);
            clean_all(&mut tracker, &dirty);
            list.clear();
        }
        let rebuilds = telemetry.counter(DIRTY_LISTS_REBUILT);

        tracker.mark_rprim_dirty(&a, DirtyBits::DIRTY_POINTS).unwrap();
        assert_eq!(ids(list.dirty_rprims(&tracker, &index)), vec!["/a"]);
        assert_eq!(list.state(), DirtyListState::StableVarying);
        assert_eq!(telemetry.counter(DIRTY_LISTS_REBUILT), rebuilds);
    }

    #[test]
    fn test_root_path_filtering() {
        let (mut tracker, mut index, telemetry) =
            setup(&["/a", "/a/x", "/ab", "/b/y", "/c/z", "/c/z/w"]);
        index.excluded.insert(PrimPath::new("/c/z/w"));
        let collection = RprimCollection::new("geometry", "hull")
            .with_root_paths(vec![PrimPath::new("/a"), PrimPath::new("/c")]);
        let mut list = DirtyList::new(collection, &mut tracker, telemetry);

        assert_eq!(
            ids(list.dirty_rprims(&tracker, &index)),
            vec!["/a", "/a/x", "/c/z"]
        );
    }

    #[test]
    fn test_empty_roots_match_nothing() {
        let (mut tracker, index, telemetry) = setup(&["/a", "/b"]);
        let collection = RprimCollection::new("geometry", "hull").with_root_paths(Vec::new());
        let mut list = DirtyList::new(collection, &mut tracker, telemetry);
        assert!(list.dirty_rprims(&tracker, &index).is_empty());
    }

    #[test]
    fn test_prune_to_varying() {
        let (mut tracker, index, telemetry) = setup(&["/a", "/b"]);
        let (a, b) = (PrimPath::new("/a"), PrimPath::new("/b"));
        let mut list = DirtyList::new(RprimCollection::new("geometry", "hull"), &mut tracker, telemetry);
        let dirty = list.dirty_rprims(&tracker, &index).to_vec();
        clean_all(&mut tracker, &dirty);

        tracker.mark_rprim_dirty(&a, DirtyBits::DIRTY_POINTS).unwrap();
        tracker.mark_rprim_dirty(&b, DirtyBits::DIRTY_POINTS).unwrap();
        let dirty = list.dirty_rprims(&tracker, &index).to_vec();
        assert_eq!(ids(&dirty), vec!["/a", "/b"]);
        clean_all(&mut tracker, &dirty);

        tracker.reset_rprim_varying_state(&a).unwrap();
        list.prune_to_varying(&tracker);
        list.clear();

        // No version moved except the change count: the pruned list is reused.
        tracker.mark_rprim_dirty(&b, DirtyBits::DIRTY_NORMALS).unwrap();
        assert_eq!(ids(list.dirty_rprims(&tracker, &index)), vec!["/b"]);
    }

    #[test]
    fn test_apply_edit_adds_and_removes_roots() {
        let (mut tracker, index, telemetry) = setup(&["/a/1", "/a/2", "/b/1", "/c/1"]);
        let collection = RprimCollection::new("geometry", "hull")
            .with_root_paths(vec![PrimPath::new("/a"), PrimPath::new("/b")]);
        let mut list = DirtyList::new(collection.clone(), &mut tracker, telemetry.clone());
        let dirty = list.dirty_rprims(&tracker, &index).to_vec();
        assert_eq!(dirty.len(), 3);
        clean_all(&mut tracker, &dirty);
        tracker.mark_rprim_clean(&PrimPath::new("/c/1"), DirtyBits::CLEAN).unwrap();

        for p in ["/a/1", "/b/1", "/c/1"] {
            tracker.mark_rprim_dirty(&PrimPath::new(p), DirtyBits::DIRTY_POINTS).unwrap();
        }
        let dirty = list.dirty_rprims(&tracker, &index).to_vec();
        assert_eq!(ids(&dirty), vec!["/a/1", "/b/1"]);
        let rebuilds = telemetry.counter(DIRTY_LISTS_REBUILT);

        let edited = collection.with_root_paths(vec![PrimPath::new("/a"), PrimPath::new("/c")]);
        list.update_collection(edited, &mut tracker, &index);

        assert_eq!(ids(list.dirty_rprims(&tracker, &index)), vec!["/a/1", "/c/1"]);
        assert_eq!(list.state(), DirtyListState::StableVarying);
        assert_eq!(telemetry.counter(DIRTY_LISTS_REBUILT), rebuilds);
    }

    #[test]
    fn test_apply_edit_rejections() {
        let (mut tracker, index, telemetry) = setup(&["/a/1"]);
        let collection = RprimCollection::new("geometry", "hull")
            .with_root_paths(vec![PrimPath::new("/a")]);
        let mut list = DirtyList::new(collection.clone(), &mut tracker, telemetry);
        list.dirty_rprims(&tracker, &index);

        let renamed = RprimCollection::new("other", "hull");
        assert!(!list.apply_edit(&renamed, &tracker, &index));

        let other_repr = RprimCollection::new("geometry", "wire")
            .with_root_paths(vec![PrimPath::new("/a")]);
        assert!(!list.apply_edit(&other_repr, &tracker, &index));

        let nested = collection.clone().with_root_paths(vec![PrimPath::new("/a/1")]);
        assert!(!list.apply_edit(&nested, &tracker, &index));

        let many: Vec<PrimPath> = (0..101).map(|i| PrimPath::new(format!("/r{i}"))).collect();
        let wide = collection.with_root_paths(many);
        assert!(!list.apply_edit(&wide, &tracker, &index));
    }

    #[test]
    fn test_rejected_edit_reinitializes() {
        let (mut tracker, index, telemetry) = setup(&["/a/1", "/b/1"]);
        let mut list = DirtyList::new(
            RprimCollection::new("geometry", "hull").with_root_paths(vec![PrimPath::new("/a")]),
            &mut tracker,
            telemetry,
        );
        let dirty = list.dirty_rprims(&tracker, &index).to_vec();
        assert_eq!(ids(&dirty), vec!["/a/1"]);

        list.update_collection(
            RprimCollection::new("geometry", "wire").with_root_paths(vec![PrimPath::new("/b")]),
            &mut tracker,
            &index,
        );
        assert_eq!(ids(list.dirty_rprims(&tracker, &index)), vec!["/b/1"]);
        assert_eq!(list.collection().repr_selector(), "wire");
    }
}
