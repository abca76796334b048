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


//! The perf-log service shared by the aggregation components.

use crate::storage::{InMemoryBackend, MetricsBackend};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use strata_core::telemetry::counters::{CACHE_NAMESPACE, RESOURCE_NAMESPACE};
use strata_core::telemetry::MetricId;

/// Write-mostly counter store with an explicit enable/disable/reset lifecycle.
///
/// Components receive an `Arc<TelemetryService>` at construction and report
/// into it; nothing in the aggregation layer reads counters back to make
/// decisions. While disabled, every write is dropped.
#[derive(Debug)]
pub struct TelemetryService {
    backend: Arc<dyn MetricsBackend>,
    enabled: AtomicBool,
}

impl TelemetryService {
    /// Creates an enabled service backed by the in-memory store.
    pub fn new() -> Self {
        Self::with_backend(Arc::new(InMemoryBackend::new()))
    }

    /// Creates an enabled service over a custom counter store.
    pub fn with_backend(backend: Arc<dyn MetricsBackend>) -> Self {
        Self {
            backend,
            enabled: AtomicBool::new(true),
        }
    }

    /// Starts recording.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    /// Stops recording; existing values are kept.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    /// Returns `true` while writes are recorded.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Adds one to a named resource counter.
    pub fn increment_counter(&self, name: &str) {
        self.add_counter(name, 1);
    }

    /// Adds `delta` to a named resource counter.
    pub fn add_counter(&self, name: &str, delta: u64) {
        self.update(MetricId::new(RESOURCE_NAMESPACE, name), &|v| {
            v.saturating_add(delta)
        });
    }

    /// Subtracts `delta` from a named resource counter, saturating at zero.
    pub fn subtract_counter(&self, name: &str, delta: u64) {
        self.update(MetricId::new(RESOURCE_NAMESPACE, name), &|v| {
            v.saturating_sub(delta)
        });
    }

    /// Overwrites a named resource counter.
    pub fn set_counter(&self, name: &str, value: u64) {
        self.update(MetricId::new(RESOURCE_NAMESPACE, name), &|_| value);
    }

    /// Reads a named resource counter; missing counters read as zero.
    pub fn counter(&self, name: &str) -> u64 {
        self.read(&MetricId::new(RESOURCE_NAMESPACE, name))
    }

    /// Records a cache hit for `cache`.
    pub fn add_cache_hit(&self, cache: &str) {
        self.update(Self::cache_id("hits", cache), &|v| v.saturating_add(1));
    }

    /// Records a cache miss for `cache`.
    pub fn add_cache_miss(&self, cache: &str) {
        self.update(Self::cache_id("misses", cache), &|v| v.saturating_add(1));
    }

    /// Number of hits recorded for `cache`.
    pub fn cache_hits(&self, cache: &str) -> u64 {
        self.read(&Self::cache_id("hits", cache))
    }

    /// Number of misses recorded for `cache`.
    pub fn cache_misses(&self, cache: &str) -> u64 {
        self.read(&Self::cache_id("misses", cache))
    }

    /// Drops every recorded value.
    pub fn reset_counters(&self) {
        if let Err(e) = self.backend.clear() {
            log::warn!("Failed to reset telemetry counters: {e}");
        }
    }

    /// Returns every recorded value keyed by its formatted counter id.
    pub fn snapshot(&self) -> Value {
        let counters = self.backend.counters().unwrap_or_else(|e| {
            log::warn!("Failed to read telemetry counters: {e}");
            Vec::new()
        });
        let map: Map<String, Value> = counters
            .into_iter()
            .map(|(id, value)| (id.to_string(), Value::from(value)))
            .collect();
        Value::Object(map)
    }

    /// The store counters are written to.
    pub fn backend(&self) -> &Arc<dyn MetricsBackend> {
        &self.backend
    }

    fn cache_id(name: &str, cache: &str) -> MetricId {
        MetricId::new(CACHE_NAMESPACE, name).with_label(cache)
    }

    fn update(&self, id: MetricId, update: &dyn Fn(u64) -> u64) {
        if !self.is_enabled() {
            return;
        }
        if let Err(e) = self.backend.update_counter(&id, update) {
            log::warn!("Failed to update counter {id}: {e}");
        }
    }

    fn read(&self, id: &MetricId) -> u64 {
        self.backend.counter(id).ok().flatten().unwrap_or(0)
    }
}

impl Default for TelemetryService {
    fn default() -> Self {
        Self::new()
    }
}
