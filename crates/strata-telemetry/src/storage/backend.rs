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

//! The counter store contract.

use std::fmt::Debug;
use strata_core::telemetry::{MetricId, MetricsResult};

/// Storage for perf-log counters.
///
/// Stores are shared across threads; every operation takes `&self`.
pub trait MetricsBackend: Send + Sync + Debug {
    /// Applies `update` to the counter `id` (starting from zero) and returns
    /// the new value.
    fn update_counter(&self, id: &MetricId, update: &dyn Fn(u64) -> u64) -> MetricsResult<u64>;

    /// Reads a counter, or `None` if it was never written.
    fn counter(&self, id: &MetricId) -> MetricsResult<Option<u64>>;

    /// Every recorded counter, sorted by id.
    fn counters(&self) -> MetricsResult<Vec<(MetricId, u64)>>;

    /// Drops every counter.
    fn clear(&self) -> MetricsResult<()>;
}
