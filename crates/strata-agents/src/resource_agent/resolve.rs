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

//! The fixed-point resolution loop over pending buffer sources.

use super::error::CommitError;
use strata_lanes::{BufferSource, BufferSourceHandle};

/// Below this many pending sources a pass runs on the calling thread.
const PARALLEL_THRESHOLD: usize = 64;

/// Outcome of [`resolve_to_fixed_point`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResolveOutcome {
    pub iterations: usize,
}

/// Polls `sources` until every one has settled.
///
/// Each pass calls [`resolve`](strata_lanes::BufferSource::resolve) on every
/// source still pending. A pass that settles nothing, or running past
/// `max_iterations`, is a stall.
pub(crate) fn resolve_to_fixed_point(
    sources: &[BufferSourceHandle],
    max_iterations: Option<usize>,
    parallel: bool,
) -> Result<ResolveOutcome, CommitError> {
    let mut pending: Vec<BufferSourceHandle> = sources
        .iter()
        .filter(|source| !source.state().is_settled())
        .cloned()
        .collect();
    let limit = max_iterations.unwrap_or(pending.len());

    let mut iterations = 0;
    while !pending.is_empty() {
        if iterations >= limit {
            log::error!(
                "resolution gave up after {iterations} passes, {} source(s) unresolved",
                pending.len()
            );
            return Err(CommitError::Stalled {
                unresolved: pending.len(),
                iterations,
            });
        }
        iterations += 1;

        let before = pending.len();
        resolve_pass(&pending, parallel);
        pending.retain(|source| !source.state().is_settled());
        log::trace!("resolve pass {iterations}: {} -> {} pending", before, pending.len());

        if pending.len() == before {
            for source in &pending {
                log::error!("'{}' cannot resolve: inconsistent dependency", source.name());
            }
            return Err(CommitError::Stalled {
                unresolved: pending.len(),
                iterations,
            });
        }
    }
    Ok(ResolveOutcome { iterations })
}

fn resolve_pass(sources: &[BufferSourceHandle], parallel: bool) {
    if !parallel || sources.len() < PARALLEL_THRESHOLD {
        for source in sources {
            source.resolve();
        }
        return;
    }

    let workers = std::thread::available_parallelism()
        .map_or(1, |n| n.get())
        .min(sources.len());
    let chunk_size = sources.len().div_ceil(workers);
    std::thread::scope(|scope| {
        for chunk in sources.chunks(chunk_size) {
            scope.spawn(move || {
                for source in chunk {
                    source.resolve();
                }
            });
        }
    });
}
