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


//! Batching of host-to-device writes.

use ahash::AHashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use strata_core::{BufferId, ResourceBackend, ResourceError};

#[derive(Debug)]
struct QueuedWrite {
    start: u64,
    data: Vec<u8>,
}

impl QueuedWrite {
    fn end(&self) -> u64 {
        self.start + self.data.len() as u64
    }
}

/// Accumulates small writes per destination buffer.
///
/// A write that starts exactly where the queued write for the same buffer
/// ends extends it; any other write submits the queued bytes first. Writes
/// larger than the threshold bypass the queue.
#[derive(Debug)]
pub struct StagingQueue {
    backend: Arc<dyn ResourceBackend>,
    threshold: usize,
    queued: Mutex<AHashMap<BufferId, QueuedWrite>>,
}

impl StagingQueue {
    /// Creates a queue that submits through `backend`.
    pub fn new(backend: Arc<dyn ResourceBackend>, threshold: usize) -> Self {
        Self {
            backend,
            threshold,
            queued: Mutex::new(AHashMap::new()),
        }
    }

    /// Stages `data` for `buffer` at `offset`.
    pub fn stage(&self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        if data.is_empty() {
            return Ok(());
        }
        if data.len() > self.threshold {
            return self.backend.write_buffer(buffer, offset, data);
        }

        let mut queued = self.queued.lock();
        match queued.get_mut(&buffer) {
            Some(entry) if entry.end() == offset => {
                entry.data.extend_from_slice(data);
            }
            Some(entry) => {
                self.backend.write_buffer(buffer, entry.start, &entry.data)?;
                entry.start = offset;
                entry.data.clear();
                entry.data.extend_from_slice(data);
            }
            None => {
                queued.insert(
                    buffer,
                    QueuedWrite {
                        start: offset,
                        data: data.to_vec(),
                    },
                );
            }
        }
        Ok(())
    }

    /// Submits every queued write.
    pub fn flush(&self) -> Result<(), ResourceError> {
        let drained: Vec<(BufferId, QueuedWrite)> = self.queued.lock().drain().collect();
        for (buffer, entry) in drained {
            self.backend.write_buffer(buffer, entry.start, &entry.data)?;
        }
        Ok(())
    }

    /// Drops queued writes for a buffer that is about to be destroyed.
    pub fn discard(&self, buffer: BufferId) {
        self.queued.lock().remove(&buffer);
    }

    /// Number of buffers with pending writes.
    pub fn pending_buffers(&self) -> usize {
        self.queued.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockBackend;
    use strata_core::BufferDescriptor;

    fn setup(threshold: usize) -> (Arc<MockBackend>, StagingQueue, BufferId) {
        let backend = Arc::new(MockBackend::new());
        let id = backend
            .create_buffer(&BufferDescriptor {
                label: None,
                size: 64,
                usage: strata_core::BufferUsage::COPY_DST,
                mapped_at_creation: false,
            })
            .unwrap();
        let queue = StagingQueue::new(backend.clone(), threshold);
        (backend, queue, id)
    }

    #[test]
    fn test_contiguous_writes_merge() {
        let (backend, queue, id) = setup(512);
        queue.stage(id, 0, &[1; 8]).unwrap();
        queue.stage(id, 8, &[2; 8]).unwrap();
        queue.stage(id, 16, &[3; 8]).unwrap();
        assert_eq!(backend.writes(), 0);

        queue.flush().unwrap();
        assert_eq!(backend.writes(), 1);
        assert_eq!(queue.pending_buffers(), 0);

        let bytes = backend.read_buffer(id, 0, 24).unwrap();
        assert_eq!(&bytes[..8], &[1; 8]);
        assert_eq!(&bytes[16..], &[3; 8]);
    }

    #[test]
    fn test_gap_submits_previous_run() {
        let (backend, queue, id) = setup(512);
        queue.stage(id, 0, &[1; 8]).unwrap();
        queue.stage(id, 32, &[2; 8]).unwrap();
        assert_eq!(backend.writes(), 1);
        queue.flush().unwrap();
        assert_eq!(backend.writes(), 2);
        assert_eq!(backend.read_buffer(id, 32, 8).unwrap(), vec![2; 8]);
    }

    #[test]
    fn test_large_writes_bypass_queue() {
        let (backend, queue, id) = setup(16);
        queue.stage(id, 0, &[7; 32]).unwrap();
        assert_eq!(backend.writes(), 1);
        assert_eq!(queue.pending_buffers(), 0);
    }
}
