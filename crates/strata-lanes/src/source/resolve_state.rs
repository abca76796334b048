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

//! The atomic resolution state shared by every buffer source.

use std::sync::atomic::{AtomicU8, Ordering};

const UNRESOLVED: u8 = 0;
const BEING_RESOLVED: u8 = 1;
const RESOLVED: u8 = 2;
const RESOLVE_ERROR: u8 = 3;

/// Unresolved -> BeingResolved -> Resolved | ResolveError.
///
/// [`try_lock`](Self::try_lock) is the only way to enter `BeingResolved`, so
/// a source is never computed twice even when resolution passes overlap.
#[derive(Debug, Default)]
pub struct ResolveState(AtomicU8);

impl ResolveState {
    /// Creates an unresolved state.
    pub const fn new() -> Self {
        Self(AtomicU8::new(UNRESOLVED))
    }

    /// Creates a state that is already resolved.
    pub const fn resolved() -> Self {
        Self(AtomicU8::new(RESOLVED))
    }

    /// Claims the source for resolution. Returns `false` if another pass
    /// holds it or it has already settled.
    pub fn try_lock(&self) -> bool {
        self.0
            .compare_exchange(UNRESOLVED, BEING_RESOLVED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Releases a claim without settling, so a later pass can retry.
    pub fn unlock(&self) {
        let _ = self.0.compare_exchange(
            BEING_RESOLVED,
            UNRESOLVED,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Marks the source as successfully resolved.
    pub fn set_resolved(&self) {
        self.0.store(RESOLVED, Ordering::Release);
    }

    /// Marks the source as failed. A failed source is settled and never retried.
    pub fn set_resolve_error(&self) {
        self.0.store(RESOLVE_ERROR, Ordering::Release);
    }

    /// `true` once the source resolved successfully.
    pub fn is_resolved(&self) -> bool {
        self.0.load(Ordering::Acquire) == RESOLVED
    }

    /// `true` once the source failed.
    pub fn has_resolve_error(&self) -> bool {
        self.0.load(Ordering::Acquire) == RESOLVE_ERROR
    }

    /// `true` once the source resolved or failed.
    pub fn is_settled(&self) -> bool {
        matches!(self.0.load(Ordering::Acquire), RESOLVED | RESOLVE_ERROR)
    }
}
