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


//! Per-primitive dirty state and the version counters derived from it.
//!
//! The tracker separates "did anything change" (the scene state version) from
//! "did a primitive's volatility change" (the varying state version). Dirty
//! lists key their caches off those counters, so every mutation below must bump
//! exactly the counters documented on it.

use ahash::AHashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use strata_core::telemetry::counters::RPRIM_DIRTY_CACHE;
use strata_core::{DirtyBits, PrimPath, TrackerError};
use strata_telemetry::TelemetryService;

type DependencyMap = AHashMap<PrimPath, BTreeSet<PrimPath>>;

/// Tracks dirty bits for primitives and instancers plus the invalidation counters.
///
/// All counters start at 1 so observers that start at 0 see a mismatch on
/// their first query. The tracker is driven from the sync thread only.
#[derive(Debug)]
pub struct ChangeTracker {
    rprim_state: BTreeMap<PrimPath, DirtyBits>,
    instancer_state: AHashMap<PrimPath, DirtyBits>,
    general_state: AHashMap<String, u64>,
    collection_state: AHashMap<String, u64>,
    instancer_rprim_dependencies: DependencyMap,
    instancer_instancer_dependencies: DependencyMap,

    varying_state_version: u64,
    rprim_index_version: u64,
    instancer_index_version: u64,
    scene_state_version: u64,
    vis_change_count: u64,
    render_tag_version: u64,
    batch_version: u64,
    needs_garbage_collection: bool,

    telemetry: Arc<TelemetryService>,
}

impl ChangeTracker {
    /// Creates an empty tracker reporting cache statistics to `telemetry`.
    pub fn new(telemetry: Arc<TelemetryService>) -> Self {
        Self {
            rprim_state: BTreeMap::new(),
            instancer_state: AHashMap::new(),
            general_state: AHashMap::new(),
            collection_state: AHashMap::new(),
            instancer_rprim_dependencies: AHashMap::new(),
            instancer_instancer_dependencies: AHashMap::new(),
            varying_state_version: 1,
            rprim_index_version: 1,
            instancer_index_version: 1,
            scene_state_version: 1,
            vis_change_count: 1,
            render_tag_version: 1,
            batch_version: 1,
            needs_garbage_collection: false,
            telemetry,
        }
    }

    // --- Rprim state ---

    /// Starts tracking `id` with `initial_bits`.
    pub fn rprim_inserted(&mut self, id: PrimPath, initial_bits: DirtyBits) {
        log::trace!("Rprim added: {id}");
        self.rprim_state.insert(id, initial_bits);
        self.scene_state_version += 1;
        self.rprim_index_version += 1;
    }

    /// Stops tracking `id` and flags that a garbage collection is due.
    pub fn rprim_removed(&mut self, id: &PrimPath) {
        log::trace!("Rprim removed: {id}");
        if self.rprim_state.remove(id).is_none() {
            log::debug!("Removing untracked rprim {id}");
        }
        self.needs_garbage_collection = true;
        self.scene_state_version += 1;
        self.rprim_index_version += 1;
        self.varying_state_version += 1;
    }

    /// Marks `bits` dirty on `id`.
    ///
    /// The first mark on a non-varying primitive promotes it to varying and
    /// bumps the varying state version. Marking with clean bits or an untracked
    /// id is a contract violation: the call is a no-op and returns an error.
    pub fn mark_rprim_dirty(&mut self, id: &PrimPath, bits: DirtyBits) -> Result<(), TrackerError> {
        if bits.is_empty() {
            return Err(contract_violation(TrackerError::CleanBits {
                operation: "mark_rprim_dirty",
            }));
        }
        let Some(state) = self.rprim_state.get_mut(id) else {
            return Err(contract_violation(TrackerError::UnknownPrim(id.clone())));
        };

        let index_bits = DirtyBits::DIRTY_RENDER_TAG | DirtyBits::DIRTY_REPR;
        // Render tag and repr changes alter dirty-list filtering, so they
        // always go through even when already set.
        if (bits & !*state).is_empty() && !bits.intersects(index_bits) {
            return Ok(());
        }

        if bits == DirtyBits::INIT_REPR {
            state.insert(DirtyBits::INIT_REPR);
            return Ok(());
        }

        let mut bits = bits;
        if !state.is_varying() {
            log::debug!("New varying state {id}: {bits}");
            bits.insert(DirtyBits::VARYING);
            self.varying_state_version += 1;
        }
        state.insert(bits);
        self.scene_state_version += 1;
        self.bump_for_bits(bits);
        Ok(())
    }

    /// Marks `bits` dirty on every tracked primitive in one pass.
    ///
    /// The varying state version is bumped at most once; the scene state
    /// version is always bumped.
    pub fn mark_all_rprims_dirty(&mut self, bits: DirtyBits) -> Result<(), TrackerError> {
        if bits.is_empty() {
            return Err(contract_violation(TrackerError::CleanBits {
                operation: "mark_all_rprims_dirty",
            }));
        }

        let index_bits = DirtyBits::DIRTY_RENDER_TAG | DirtyBits::DIRTY_REPR;
        let mut varying_state_updated = false;
        for state in self.rprim_state.values_mut() {
            if bits.intersects(!*state | index_bits) {
                state.insert(bits);
                if !state.is_varying() {
                    state.insert(DirtyBits::VARYING);
                    varying_state_updated = true;
                }
            }
        }

        if varying_state_updated {
            self.varying_state_version += 1;
        }
        self.scene_state_version += 1;
        self.bump_for_bits(bits);
        Ok(())
    }

    /// Replaces the dirty bits of `id` with `new_bits`, keeping the varying flag.
    pub fn mark_rprim_clean(&mut self, id: &PrimPath, new_bits: DirtyBits) -> Result<(), TrackerError> {
        let Some(state) = self.rprim_state.get_mut(id) else {
            return Err(contract_violation(TrackerError::UnknownPrim(id.clone())));
        };
        log::trace!("Rprim cleaned: {id}");
        *state = (*state & DirtyBits::VARYING) | new_bits;
        Ok(())
    }

    /// Clears the varying flag on every clean primitive.
    pub fn reset_varying_state(&mut self) {
        self.varying_state_version += 1;
        for state in self.rprim_state.values_mut() {
            if state.is_clean() {
                state.remove(DirtyBits::VARYING);
            }
        }
    }

    /// Clears the varying flag on `id` without touching any counter.
    ///
    /// The change is picked up the next time the varying state version moves.
    pub fn reset_rprim_varying_state(&mut self, id: &PrimPath) -> Result<(), TrackerError> {
        let Some(state) = self.rprim_state.get_mut(id) else {
            return Err(contract_violation(TrackerError::UnknownPrim(id.clone())));
        };
        log::trace!("Resetting rprim varying state: {id}");
        state.remove(DirtyBits::VARYING);
        Ok(())
    }

    /// Marks the bit tracking primvar `name` dirty on `id`.
    pub fn mark_primvar_dirty(&mut self, id: &PrimPath, name: &str) -> Result<(), TrackerError> {
        self.mark_rprim_dirty(id, DirtyBits::for_primvar(name))
    }

    /// Returns the dirty bits of `id`, including the varying flag.
    pub fn rprim_dirty_bits(&self, id: &PrimPath) -> Result<DirtyBits, TrackerError> {
        self.rprim_state
            .get(id)
            .copied()
            .ok_or_else(|| TrackerError::UnknownPrim(id.clone()))
    }

    /// Returns `true` if `id` is tracked.
    pub fn contains_rprim(&self, id: &PrimPath) -> bool {
        self.rprim_state.contains_key(id)
    }

    /// Number of tracked primitives.
    pub fn rprim_count(&self) -> usize {
        self.rprim_state.len()
    }

    /// Iterates tracked primitives and their bits in path order.
    pub fn rprims(&self) -> impl Iterator<Item = (&PrimPath, DirtyBits)> + '_ {
        self.rprim_state.iter().map(|(id, bits)| (id, *bits))
    }

    // --- Instancer state ---

    /// Starts tracking instancer `id`.
    pub fn instancer_inserted(&mut self, id: PrimPath, initial_bits: DirtyBits) {
        log::trace!("Instancer added: {id}");
        self.instancer_state.insert(id, initial_bits);
        self.scene_state_version += 1;
        self.instancer_index_version += 1;
    }

    /// Stops tracking instancer `id`.
    pub fn instancer_removed(&mut self, id: &PrimPath) {
        log::trace!("Instancer removed: {id}");
        self.instancer_state.remove(id);
        self.scene_state_version += 1;
        self.instancer_index_version += 1;
    }

    /// Records that `rprim` consumes data from `instancer`.
    pub fn add_instancer_rprim_dependency(&mut self, instancer: &PrimPath, rprim: &PrimPath) {
        add_dependency(&mut self.instancer_rprim_dependencies, instancer, rprim);
    }

    /// Removes an instancer to rprim edge.
    pub fn remove_instancer_rprim_dependency(&mut self, instancer: &PrimPath, rprim: &PrimPath) {
        remove_dependency(&mut self.instancer_rprim_dependencies, instancer, rprim);
    }

    /// Records that instancer `child` is nested under instancer `parent`.
    pub fn add_instancer_instancer_dependency(&mut self, parent: &PrimPath, child: &PrimPath) {
        add_dependency(&mut self.instancer_instancer_dependencies, parent, child);
    }

    /// Removes an instancer to instancer edge.
    pub fn remove_instancer_instancer_dependency(&mut self, parent: &PrimPath, child: &PrimPath) {
        remove_dependency(&mut self.instancer_instancer_dependencies, parent, child);
    }

    /// Marks `bits` dirty on instancer `id` and propagates to its dependents.
    ///
    /// Dependents receive `DIRTY_INSTANCER`, plus `DIRTY_TRANSFORM` and
    /// `DIRTY_INSTANCE_INDEX` when those were part of `bits`.
    pub fn mark_instancer_dirty(&mut self, id: &PrimPath, bits: DirtyBits) -> Result<(), TrackerError> {
        if bits.is_empty() {
            return Err(contract_violation(TrackerError::CleanBits {
                operation: "mark_instancer_dirty",
            }));
        }
        let Some(state) = self.instancer_state.get_mut(id) else {
            return Err(contract_violation(TrackerError::UnknownInstancer(id.clone())));
        };
        if (bits & !*state).is_empty() {
            return Ok(());
        }
        state.insert(bits);
        self.scene_state_version += 1;

        let mut to_propagate = DirtyBits::DIRTY_INSTANCER;
        to_propagate.insert(bits & (DirtyBits::DIRTY_TRANSFORM | DirtyBits::DIRTY_INSTANCE_INDEX));

        let instancers: Vec<PrimPath> = self
            .instancer_instancer_dependencies
            .get(id)
            .map(|deps| deps.iter().cloned().collect())
            .unwrap_or_default();
        for dependent in &instancers {
            // Failures are already reported by the nested call.
            let _ = self.mark_instancer_dirty(dependent, to_propagate);
        }

        let rprims: Vec<PrimPath> = self
            .instancer_rprim_dependencies
            .get(id)
            .map(|deps| deps.iter().cloned().collect())
            .unwrap_or_default();
        for dependent in &rprims {
            let _ = self.mark_rprim_dirty(dependent, to_propagate);
        }
        Ok(())
    }

    /// Replaces the dirty bits of instancer `id`, keeping the varying flag.
    pub fn mark_instancer_clean(&mut self, id: &PrimPath, new_bits: DirtyBits) -> Result<(), TrackerError> {
        let Some(state) = self.instancer_state.get_mut(id) else {
            return Err(contract_violation(TrackerError::UnknownInstancer(id.clone())));
        };
        log::trace!("Instancer cleaned: {id}");
        *state = (*state & DirtyBits::VARYING) | new_bits;
        Ok(())
    }

    /// Returns the dirty bits of instancer `id`.
    pub fn instancer_dirty_bits(&self, id: &PrimPath) -> Result<DirtyBits, TrackerError> {
        self.instancer_state
            .get(id)
            .copied()
            .ok_or_else(|| TrackerError::UnknownInstancer(id.clone()))
    }

    // --- Queries ---

    /// Returns `true` if any non-varying bit of `id` is set.
    pub fn is_rprim_dirty(&self, id: &PrimPath) -> bool {
        self.bits_or_clean(id).is_dirty()
    }

    /// Returns `true` if the topology of `id` is dirty.
    pub fn is_topology_dirty(&self, id: &PrimPath) -> bool {
        self.check(id, DirtyBits::DIRTY_TOPOLOGY)
    }

    /// Returns `true` if the double-sided state of `id` is dirty.
    pub fn is_double_sided_dirty(&self, id: &PrimPath) -> bool {
        self.check(id, DirtyBits::DIRTY_DOUBLE_SIDED)
    }

    /// Returns `true` if the cull style of `id` is dirty.
    pub fn is_cull_style_dirty(&self, id: &PrimPath) -> bool {
        self.check(id, DirtyBits::DIRTY_CULL_STYLE)
    }

    /// Returns `true` if the display style of `id` is dirty.
    pub fn is_display_style_dirty(&self, id: &PrimPath) -> bool {
        self.check(id, DirtyBits::DIRTY_DISPLAY_STYLE)
    }

    /// Returns `true` if the subdivision tags of `id` are dirty.
    pub fn is_subdiv_tags_dirty(&self, id: &PrimPath) -> bool {
        self.check(id, DirtyBits::DIRTY_SUBDIV_TAGS)
    }

    /// Returns `true` if the transform of `id` is dirty.
    pub fn is_transform_dirty(&self, id: &PrimPath) -> bool {
        self.check(id, DirtyBits::DIRTY_TRANSFORM)
    }

    /// Returns `true` if the visibility of `id` is dirty.
    pub fn is_visibility_dirty(&self, id: &PrimPath) -> bool {
        self.check(id, DirtyBits::DIRTY_VISIBILITY)
    }

    /// Returns `true` if the extent of `id` is dirty.
    pub fn is_extent_dirty(&self, id: &PrimPath) -> bool {
        self.check(id, DirtyBits::DIRTY_EXTENT)
    }

    /// Returns `true` if the primitive id of `id` is dirty.
    pub fn is_prim_id_dirty(&self, id: &PrimPath) -> bool {
        self.check(id, DirtyBits::DIRTY_PRIM_ID)
    }

    /// Returns `true` if upstream instancer data of `id` is dirty.
    pub fn is_instancer_dirty(&self, id: &PrimPath) -> bool {
        self.check(id, DirtyBits::DIRTY_INSTANCER)
    }

    /// Returns `true` if the instance indices of `id` are dirty.
    pub fn is_instance_index_dirty(&self, id: &PrimPath) -> bool {
        self.check(id, DirtyBits::DIRTY_INSTANCE_INDEX)
    }

    /// Returns `true` if any primvar of `id` is dirty.
    pub fn is_any_primvar_dirty(&self, id: &PrimPath) -> bool {
        self.check(
            id,
            DirtyBits::DIRTY_POINTS
                | DirtyBits::DIRTY_NORMALS
                | DirtyBits::DIRTY_WIDTHS
                | DirtyBits::DIRTY_PRIMVAR,
        )
    }

    /// Returns `true` if primvar `name` of `id` is dirty.
    ///
    /// Velocities and accelerations travel with the points bit.
    pub fn is_primvar_dirty(&self, id: &PrimPath, name: &str) -> bool {
        let mask = match name {
            "velocities" | "accelerations" => DirtyBits::DIRTY_POINTS,
            other => DirtyBits::for_primvar(other),
        };
        self.check(id, mask)
    }

    /// Returns `true` if the repr of `id` is dirty. Not reported to telemetry.
    pub fn is_repr_dirty(&self, id: &PrimPath) -> bool {
        self.bits_or_clean(id).intersects(DirtyBits::DIRTY_REPR)
    }

    fn check(&self, id: &PrimPath, mask: DirtyBits) -> bool {
        let is_dirty = self.bits_or_clean(id).intersects(mask);
        if is_dirty {
            self.telemetry.add_cache_miss(RPRIM_DIRTY_CACHE);
        } else {
            self.telemetry.add_cache_hit(RPRIM_DIRTY_CACHE);
        }
        is_dirty
    }

    fn bits_or_clean(&self, id: &PrimPath) -> DirtyBits {
        match self.rprim_state.get(id) {
            Some(bits) => *bits,
            None => {
                log::error!("{}", TrackerError::UnknownPrim(id.clone()));
                DirtyBits::CLEAN
            }
        }
    }

    // --- Collections and general state ---

    /// Starts tracking collection `name`. Existing collections are left untouched.
    pub fn add_collection(&mut self, name: &str) {
        self.collection_state.entry(name.to_owned()).or_insert(1);
    }

    /// Bumps the version of collection `name`.
    pub fn mark_collection_dirty(&mut self, name: &str) -> Result<(), TrackerError> {
        let Some(version) = self.collection_state.get_mut(name) else {
            return Err(contract_violation(TrackerError::UnknownCollection(
                name.to_owned(),
            )));
        };
        *version += 1;
        self.scene_state_version += 1;
        Ok(())
    }

    /// Bumps the version of every tracked collection.
    pub fn mark_all_collections_dirty(&mut self) {
        for version in self.collection_state.values_mut() {
            *version += 1;
        }
        self.scene_state_version += 1;
    }

    /// Returns the membership version of collection `name`.
    ///
    /// The value folds in the rprim index version so that insertions and
    /// removals invalidate every collection. An unknown collection is reported
    /// and the bare index version is returned.
    pub fn collection_version(&self, name: &str) -> u64 {
        match self.collection_state.get(name) {
            Some(version) => version + self.rprim_index_version,
            None => {
                log::error!("{}", TrackerError::UnknownCollection(name.to_owned()));
                self.rprim_index_version
            }
        }
    }

    /// Starts tracking general state `name`, or marks it dirty if it exists.
    pub fn add_state(&mut self, name: &str) {
        *self.general_state.entry(name.to_owned()).or_insert(0) += 1;
    }

    /// Bumps the version of general state `name`.
    pub fn mark_state_dirty(&mut self, name: &str) -> Result<(), TrackerError> {
        match self.general_state.get_mut(name) {
            Some(version) => {
                *version += 1;
                Ok(())
            }
            None => Err(contract_violation(TrackerError::UnknownState(name.to_owned()))),
        }
    }

    /// Returns the version of general state `name`, or 0 if it is unknown.
    pub fn state_version(&self, name: &str) -> u64 {
        match self.general_state.get(name) {
            Some(version) => *version,
            None => {
                log::error!("{}", TrackerError::UnknownState(name.to_owned()));
                0
            }
        }
    }

    // --- Global counters ---

    /// Bumps the render tag version.
    pub fn mark_render_tags_dirty(&mut self) {
        self.render_tag_version += 1;
        self.scene_state_version += 1;
    }

    /// Bumps the batch version so cached draw batches are rebuilt.
    pub fn mark_batches_dirty(&mut self) {
        self.batch_version += 1;
    }

    /// Version bumped whenever a primitive enters or leaves the varying state.
    pub fn varying_state_version(&self) -> u64 {
        self.varying_state_version
    }

    /// Version bumped on primitive insertion/removal and index-affecting edits.
    pub fn rprim_index_version(&self) -> u64 {
        self.rprim_index_version
    }

    /// Version bumped on instancer insertion/removal.
    pub fn instancer_index_version(&self) -> u64 {
        self.instancer_index_version
    }

    /// Global change count.
    pub fn scene_state_version(&self) -> u64 {
        self.scene_state_version
    }

    /// Version bumped on visibility changes.
    pub fn visibility_change_count(&self) -> u64 {
        self.vis_change_count
    }

    /// Version bumped on render tag changes.
    pub fn render_tag_version(&self) -> u64 {
        self.render_tag_version
    }

    /// Version bumped when draw batches must be rebuilt.
    pub fn batch_version(&self) -> u64 {
        self.batch_version
    }

    /// Returns `true` after a primitive was removed and before the flag is cleared.
    pub fn is_garbage_collection_needed(&self) -> bool {
        self.needs_garbage_collection
    }

    /// Marks that a garbage collection pass is due.
    pub fn set_garbage_collection_needed(&mut self) {
        self.needs_garbage_collection = true;
    }

    /// Clears the garbage collection flag.
    pub fn clear_garbage_collection_needed(&mut self) {
        self.needs_garbage_collection = false;
    }

    fn bump_for_bits(&mut self, bits: DirtyBits) {
        if bits.intersects(DirtyBits::DIRTY_VISIBILITY) {
            self.vis_change_count += 1;
        }
        if bits.intersects(DirtyBits::DIRTY_RENDER_TAG) {
            self.render_tag_version += 1;
        }
        if bits.intersects(DirtyBits::DIRTY_RENDER_TAG | DirtyBits::DIRTY_REPR) {
            self.rprim_index_version += 1;
        }
    }
}

fn contract_violation(err: TrackerError) -> TrackerError {
    log::error!("{err}");
    err
}

fn add_dependency(map: &mut DependencyMap, parent: &PrimPath, child: &PrimPath) {
    map.entry(parent.clone()).or_default().insert(child.clone());
}

fn remove_dependency(map: &mut DependencyMap, parent: &PrimPath, child: &PrimPath) {
    if let Some(children) = map.get_mut(parent) {
        children.remove(child);
        if children.is_empty() {
            map.remove(parent);
        }
    }
}
