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

use strata_core::ResourceError;
use thiserror::Error;

/// A failure that aborts a whole [`commit`](super::ResourceRegistry::commit).
///
/// Per-source and per-computation problems are logged and skipped; only
/// non-convergence and backend failures end up here.
#[derive(Debug, Error)]
pub enum CommitError {
    /// Resolution made no progress, or ran out of passes, with sources
    /// still unresolved. Usually a dependency cycle or an unregistered input.
    #[error("buffer source resolution stalled with {unresolved} source(s) unresolved after {iterations} pass(es)")]
    Stalled {
        /// Sources that never settled.
        unresolved: usize,
        /// Passes run before giving up.
        iterations: usize,
    },
    /// The backend rejected an allocation, copy, or upload.
    #[error(transparent)]
    Resource(#[from] ResourceError),
}
