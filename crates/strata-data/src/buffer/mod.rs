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


//! The striped interleaved allocator.
//!
//! Per-primitive constant data (transforms, colors, instance ids) is packed
//! as one struct per primitive into shared device buffers. Ranges are handed
//! out by a [`BufferArrayRegistry`], storage is rebuilt by reallocation, and
//! dropped ranges are reclaimed by garbage collection.

pub mod error;
pub mod layout;
pub mod manager;
pub mod range;
pub mod registry;
pub mod relocator;
pub mod staging;
pub mod striped;

pub use error::RangeError;
pub use layout::{compute_padding, FieldLayout, InterleavedLayout};
pub use manager::{InterleavedFlavor, InterleavedMemoryManager};
pub use range::InterleavedRange;
pub use registry::BufferArrayRegistry;
pub use relocator::BufferRelocator;
pub use staging::StagingQueue;
pub use striped::{AggregateContext, AggregateParams, StripedInterleavedBuffer};
