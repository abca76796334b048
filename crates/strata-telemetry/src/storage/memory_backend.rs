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

//! An in-process counter store.

use super::backend::MetricsBackend;
use std::collections::BTreeMap;
use std::sync::RwLock;
use strata_core::telemetry::{MetricId, MetricsError, MetricsResult};

/// Keeps counters in an ordered map behind a lock.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    counters: RwLock<BTreeMap<MetricId, u64>>,
}

impl InMemoryBackend {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> MetricsError {
    MetricsError::StorageError("counter lock poisoned".to_owned())
}

impl MetricsBackend for InMemoryBackend {
    fn update_counter(&self, id: &MetricId, update: &dyn Fn(u64) -> u64) -> MetricsResult<u64> {
        let mut counters = self.counters.write().map_err(poisoned)?;
        let value = counters.entry(id.clone()).or_insert(0);
        *value = update(*value);
        Ok(*value)
    }

    fn counter(&self, id: &MetricId) -> MetricsResult<Option<u64>> {
        Ok(self.counters.read().map_err(poisoned)?.get(id).copied())
    }

    fn counters(&self) -> MetricsResult<Vec<(MetricId, u64)>> {
        let counters = self.counters.read().map_err(poisoned)?;
        Ok(counters.iter().map(|(id, v)| (id.clone(), *v)).collect())
    }

    fn clear(&self) -> MetricsResult<()> {
        self.counters.write().map_err(poisoned)?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_starts_from_zero() {
        let store = InMemoryBackend::new();
        let id = MetricId::new("resource", "vbo_relocated");
        assert_eq!(store.counter(&id).unwrap(), None);
        assert_eq!(store.update_counter(&id, &|v| v + 2).unwrap(), 2);
        assert_eq!(store.update_counter(&id, &|v| v * 5).unwrap(), 10);
        assert_eq!(store.counter(&id).unwrap(), Some(10));
    }

    #[test]
    fn test_counters_are_sorted_and_clearable() {
        let store = InMemoryBackend::new();
        store
            .update_counter(&MetricId::new("resource", "b"), &|_| 1)
            .unwrap();
        store
            .update_counter(&MetricId::new("cache", "hits").with_label("x"), &|_| 3)
            .unwrap();
        store
            .update_counter(&MetricId::new("resource", "a"), &|_| 2)
            .unwrap();

        let names: Vec<String> = store
            .counters()
            .unwrap()
            .into_iter()
            .map(|(id, _)| id.to_string())
            .collect();
        assert_eq!(names, vec!["cache:hits[x]", "resource:a", "resource:b"]);

        store.clear().unwrap();
        assert!(store.counters().unwrap().is_empty());
    }
}
