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

//! Drives one collection's dirty list through the scene delegate each frame.

use crate::resource_agent::{CommitError, CommitReport, ResourceRegistry};
use std::sync::Arc;
use strata_core::{DirtyBits, PrimPath, RprimCollection, SceneIndex, SyncConfig, TrackerError};
use strata_data::{ChangeTracker, DirtyList};
use strata_telemetry::TelemetryService;
use thiserror::Error;

/// The scene-delegate side of a sync: pulls data for one dirty primitive.
pub trait RprimSync {
    /// Syncs `id` and returns the bits that are still dirty afterwards
    /// (usually [`DirtyBits::CLEAN`]).
    fn sync_rprim(&mut self, id: &PrimPath, dirty_bits: DirtyBits) -> DirtyBits;
}

/// A failure that aborts a frame.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A change-tracker contract was violated.
    #[error("change tracker: {0}")]
    Tracker(#[from] TrackerError),
    /// The resource commit or garbage collection failed.
    #[error(transparent)]
    Commit(#[from] CommitError),
}

/// What one [`SyncAgent::run`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Ids the dirty list handed out.
    pub dirty_list_size: usize,
    /// Ids forwarded to the delegate.
    pub synced: usize,
    /// Ids that turned out to be clean.
    pub skipped: usize,
    /// Ids no longer flagged varying.
    pub non_varying: usize,
    /// The tracker's varying state was reset.
    pub varying_reset: bool,
    /// The dirty list was pruned to its varying ids.
    pub pruned: bool,
    /// Garbage collection ran after the commit.
    pub garbage_collected: bool,
    /// The resource commit, if a registry is attached.
    pub commit: Option<CommitReport>,
}

/// Syncs the dirty primitives of one collection each frame.
///
/// After syncing, a list that handed out more than
/// `min_dirty_list_size` ids is tuned: if too many ids were already clean the
/// tracker's varying state is reset, otherwise if too many ids stopped
/// varying the list is pruned to the varying ones.
pub struct SyncAgent {
    dirty_list: DirtyList,
    config: SyncConfig,
    resources: Option<Arc<ResourceRegistry>>,
    frame_count: u64,
}

impl SyncAgent {
    /// Creates an agent for `collection`.
    pub fn new(
        collection: RprimCollection,
        tracker: &mut ChangeTracker,
        config: SyncConfig,
        telemetry: Arc<TelemetryService>,
    ) -> Self {
        Self {
            dirty_list: DirtyList::new(collection, tracker, telemetry),
            config,
            resources: None,
            frame_count: 0,
        }
    }

    /// Commits `registry` after each sync and collects garbage when the
    /// tracker asks for it.
    pub fn with_resource_registry(mut self, registry: Arc<ResourceRegistry>) -> Self {
        self.resources = Some(registry);
        self
    }

    /// The dirty list being driven.
    pub fn dirty_list(&self) -> &DirtyList {
        &self.dirty_list
    }

    /// Frames run so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Switches to a new collection, patching the cached ids when possible.
    pub fn update_collection(
        &mut self,
        collection: RprimCollection,
        tracker: &mut ChangeTracker,
        index: &dyn SceneIndex,
    ) {
        self.dirty_list.update_collection(collection, tracker, index);
    }

    /// Runs one frame.
    pub fn run(
        &mut self,
        tracker: &mut ChangeTracker,
        index: &dyn SceneIndex,
        delegate: &mut dyn RprimSync,
    ) -> Result<SyncReport, SyncError> {
        let ids = self.dirty_list.dirty_rprims(tracker, index).to_vec();
        let mut report = SyncReport {
            dirty_list_size: ids.len(),
            ..SyncReport::default()
        };

        for id in &ids {
            let bits = match tracker.rprim_dirty_bits(id) {
                Ok(bits) => bits,
                Err(err) => {
                    log::warn!("SyncAgent: {err}");
                    continue;
                }
            };
            if !bits.is_varying() {
                report.non_varying += 1;
            }
            if bits.is_clean() {
                report.skipped += 1;
                continue;
            }

            let remaining = delegate.sync_rprim(id, bits);
            tracker.mark_rprim_clean(id, remaining)?;
            report.synced += 1;
        }

        if ids.len() > self.config.min_dirty_list_size {
            let len = ids.len() as f32;
            if report.skipped as f32 > len * self.config.min_ratio_rprims_skipped {
                log::debug!(
                    "SyncAgent: {} of {} ids were clean, resetting varying state",
                    report.skipped,
                    ids.len()
                );
                tracker.reset_varying_state();
                report.varying_reset = true;
            } else if report.non_varying as f32 > len * self.config.min_ratio_rprims_non_varying {
                log::debug!(
                    "SyncAgent: {} of {} ids stopped varying, pruning",
                    report.non_varying,
                    ids.len()
                );
                self.dirty_list.prune_to_varying(tracker);
                report.pruned = true;
            }
        }
        self.dirty_list.clear();

        if let Some(resources) = &self.resources {
            report.commit = Some(resources.commit()?);
            if tracker.is_garbage_collection_needed() {
                resources.garbage_collect()?;
                tracker.clear_garbage_collection_needed();
                report.garbage_collected = true;
            }
        }

        self.frame_count += 1;
        log::trace!("SyncAgent frame {}: {report:?}", self.frame_count);
        Ok(report)
    }
}
