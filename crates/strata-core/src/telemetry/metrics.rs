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

//! Identifiers for perf-log counters.

use std::fmt;

/// Names one perf-log counter.
///
/// Resource counters are plain `namespace:name` pairs. Cache statistics add
/// the cache they belong to as a label, so `cache:hits[rprim_dirty]` and
/// `cache:hits[collections_clean]` are distinct counters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricId {
    /// Counter family (`resource`, `cache`).
    pub namespace: &'static str,
    /// Counter name within the family.
    pub name: String,
    /// Optional discriminator, e.g. the cache name.
    pub label: Option<String>,
}

impl MetricId {
    /// Creates an unlabelled id.
    pub fn new(namespace: &'static str, name: impl Into<String>) -> Self {
        Self {
            namespace,
            name: name.into(),
            label: None,
        }
    }

    /// Returns the id with `label` attached.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)?;
        if let Some(label) = &self.label {
            write!(f, "[{label}]")?;
        }
        Ok(())
    }
}

/// A specialized `Result` type for counter storage.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// An error raised by a counter store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricsError {
    /// The store could not be accessed (e.g. a poisoned lock).
    StorageError(String),
}

impl fmt::Display for MetricsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricsError::StorageError(msg) => write!(f, "Counter storage error: {msg}"),
        }
    }
}

impl std::error::Error for MetricsError {}
