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

//! Device buffer handles and creation parameters.

use crate::strata_bitflags;
use std::borrow::Cow;

strata_bitflags! {
    /// How an aggregate's device buffer is bound and copied.
    pub struct BufferUsage: u32 {
        /// Read by buffer-to-buffer copies (relocation, compaction).
        const COPY_SRC = 1 << 2;
        /// Written by uploads and copies.
        const COPY_DST = 1 << 3;
        /// Bound as a uniform block.
        const UNIFORM = 1 << 6;
        /// Bound as a shader storage block.
        const STORAGE = 1 << 7;
    }
}

strata_bitflags! {
    /// Hints describing how an aggregate's contents are expected to change.
    ///
    /// Ranges with different hints never share an aggregate.
    pub struct UsageHint: u32 {
        /// Contents are written once and never updated in place.
        const IMMUTABLE = 1 << 0;
        /// Element counts are expected to change frequently.
        const SIZE_VARYING = 1 << 1;
    }
}

/// Parameters for [`crate::ResourceBackend::create_buffer`].
#[derive(Debug, Clone)]
pub struct BufferDescriptor<'a> {
    /// Name shown in backend logs, e.g. the aggregate's role.
    pub label: Option<Cow<'a, str>>,
    /// Byte size.
    pub size: u64,
    /// Binding and copy capabilities.
    pub usage: BufferUsage,
    /// Whether the host may write the buffer before first use.
    pub mapped_at_creation: bool,
}

/// Backend-assigned handle of one device buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub usize);
