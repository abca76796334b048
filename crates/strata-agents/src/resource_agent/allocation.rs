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

//! Device memory tally.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Device bytes held by the registry's aggregates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAllocation {
    /// Bytes per aggregate role, summed across both flavours.
    pub roles: BTreeMap<String, u64>,
    /// Bytes held by uniform-block aggregates.
    pub ubo_size: u64,
    /// Bytes held by storage-block aggregates.
    pub ssbo_size: u64,
    /// Total device bytes.
    pub gpu_memory_used: u64,
}
