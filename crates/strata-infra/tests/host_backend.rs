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


use std::sync::Arc;
use std::thread;
use strata_core::{BufferDescriptor, BufferUsage, ResourceBackend};
use strata_infra::HostBackend;

#[test]
fn test_concurrent_buffer_creation_yields_unique_ids() {
    // --- ARRANGE ---
    let backend = Arc::new(HostBackend::new());

    // --- ACT ---
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let backend = backend.clone();
            thread::spawn(move || {
                (0..25)
                    .map(|_| {
                        backend
                            .create_buffer(&BufferDescriptor {
                                label: None,
                                size: 16,
                                usage: BufferUsage::UNIFORM,
                                mapped_at_creation: false,
                            })
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    let mut ids: Vec<_> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    // --- ASSERT ---
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 100);
    let stats = backend.stats();
    assert_eq!(stats.live_buffers, 100);
    assert_eq!(stats.allocated_bytes, 1600);
}

#[test]
fn test_clones_share_storage() {
    // --- ARRANGE ---
    let backend = HostBackend::new();
    let clone = backend.clone();
    let id = backend
        .create_buffer(&BufferDescriptor {
            label: None,
            size: 4,
            usage: BufferUsage::STORAGE,
            mapped_at_creation: false,
        })
        .unwrap();

    // --- ACT ---
    clone.write_buffer(id, 0, &[5, 6, 7, 8]).unwrap();

    // --- ASSERT ---
    assert_eq!(backend.read_buffer(id, 0, 4).unwrap(), vec![5, 6, 7, 8]);
    assert_eq!(backend.buffer_usage(id), Some(BufferUsage::STORAGE));
}
