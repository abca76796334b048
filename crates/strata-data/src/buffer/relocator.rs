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


//! Coalesced device-to-device copies used when an aggregate is reallocated.

use smallvec::SmallVec;
use strata_core::{BufferId, ResourceBackend, ResourceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CopyUnit {
    read_offset: u64,
    write_offset: u64,
    size: u64,
}

impl CopyUnit {
    fn concat(&mut self, next: &CopyUnit) -> bool {
        if self.read_offset + self.size == next.read_offset
            && self.write_offset + self.size == next.write_offset
        {
            self.size += next.size;
            return true;
        }
        false
    }
}

/// Collects old-to-new byte moves between two buffers and merges runs that
/// are contiguous on both sides into a single copy.
#[derive(Debug)]
pub struct BufferRelocator {
    source: BufferId,
    destination: BufferId,
    queue: SmallVec<[CopyUnit; 8]>,
}

impl BufferRelocator {
    /// Starts a relocation from `source` into `destination`.
    pub fn new(source: BufferId, destination: BufferId) -> Self {
        Self {
            source,
            destination,
            queue: SmallVec::new(),
        }
    }

    /// Schedules `size` bytes at `read_offset` to land at `write_offset`.
    pub fn add_range(&mut self, read_offset: u64, write_offset: u64, size: u64) {
        let unit = CopyUnit {
            read_offset,
            write_offset,
            size,
        };
        if let Some(last) = self.queue.last_mut() {
            if last.concat(&unit) {
                return;
            }
        }
        self.queue.push(unit);
    }

    /// Number of copies that [`BufferRelocator::commit`] will issue.
    pub fn pending_copies(&self) -> usize {
        self.queue.len()
    }

    /// Issues the merged copies and returns how many were submitted.
    pub fn commit(self, backend: &dyn ResourceBackend) -> Result<usize, ResourceError> {
        for unit in &self.queue {
            backend.copy_buffer_to_buffer(
                self.source,
                unit.read_offset,
                self.destination,
                unit.write_offset,
                unit.size,
            )?;
        }
        Ok(self.queue.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contiguous_runs_merge() {
        let mut relocator = BufferRelocator::new(BufferId(1), BufferId(2));
        relocator.add_range(0, 0, 64);
        relocator.add_range(64, 64, 64);
        relocator.add_range(192, 128, 64);
        relocator.add_range(256, 192, 64);
        assert_eq!(relocator.pending_copies(), 2);
    }

    #[test]
    fn test_gap_on_either_side_breaks_run() {
        let mut relocator = BufferRelocator::new(BufferId(1), BufferId(2));
        relocator.add_range(0, 0, 32);
        relocator.add_range(32, 64, 32);
        relocator.add_range(96, 96, 32);
        assert_eq!(relocator.pending_copies(), 3);
    }
}
