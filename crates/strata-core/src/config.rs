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


//! Tunables for the aggregation layer.
//!
//! A [`StrataConfig`] is built once, validated, and handed to the sync agent
//! and the resource registry. It can be loaded from RON text; every field is
//! optional in the source and falls back to its default.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Allocator and commit tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Alignment of uniform-block offsets in bytes. Zero or a power of two.
    pub uniform_buffer_offset_alignment: usize,
    /// Largest aggregate the uniform flavour may create, in bytes.
    pub max_uniform_block_size: usize,
    /// Largest aggregate the storage flavour may create, in bytes.
    pub max_storage_block_size: usize,
    /// Staged writes at or above this size bypass the staging queue.
    pub staging_queue_threshold: usize,
    /// Upper bound on resolve passes per commit. `None` uses the pending count.
    pub max_resolve_iterations: Option<usize>,
    /// Resolve independent sources on the rayon pool.
    pub parallel_resolve: bool,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            uniform_buffer_offset_alignment: 256,
            max_uniform_block_size: 64 * 1024,
            max_storage_block_size: 128 * 1024 * 1024,
            staging_queue_threshold: 512 * 1024,
            max_resolve_iterations: None,
            parallel_resolve: true,
        }
    }
}

/// Dirty-list maintenance heuristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Heuristics only run for dirty lists longer than this.
    pub min_dirty_list_size: usize,
    /// Skipped-prim ratio above which varying state is reset.
    pub min_ratio_rprims_skipped: f32,
    /// Non-varying ratio above which the dirty list is pruned.
    pub min_ratio_rprims_non_varying: f32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            min_dirty_list_size: 500,
            min_ratio_rprims_skipped: 0.25,
            min_ratio_rprims_non_varying: 0.10,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrataConfig {
    /// Allocator and commit tunables.
    pub resources: ResourceConfig,
    /// Dirty-list heuristics.
    pub sync: SyncConfig,
}

/// An error raised while loading or validating a [`StrataConfig`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The RON text could not be parsed.
    Parse(String),
    /// A field holds a value outside its accepted range.
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "Failed to parse configuration: {msg}"),
            ConfigError::Invalid { field, reason } => {
                write!(f, "Invalid configuration value for '{field}': {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl StrataConfig {
    /// Parses and validates a configuration from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: StrataConfig =
            ron::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every field against its accepted range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.resources;
        let alignment = r.uniform_buffer_offset_alignment;
        if alignment != 0 && !alignment.is_power_of_two() {
            return Err(ConfigError::Invalid {
                field: "resources.uniform_buffer_offset_alignment",
                reason: format!("{alignment} is not zero or a power of two"),
            });
        }
        if r.max_uniform_block_size == 0 {
            return Err(ConfigError::Invalid {
                field: "resources.max_uniform_block_size",
                reason: "must be non-zero".to_owned(),
            });
        }
        if r.max_storage_block_size == 0 {
            return Err(ConfigError::Invalid {
                field: "resources.max_storage_block_size",
                reason: "must be non-zero".to_owned(),
            });
        }
        if r.max_resolve_iterations == Some(0) {
            return Err(ConfigError::Invalid {
                field: "resources.max_resolve_iterations",
                reason: "must allow at least one pass".to_owned(),
            });
        }
        let s = &self.sync;
        for (field, ratio) in [
            ("sync.min_ratio_rprims_skipped", s.min_ratio_rprims_skipped),
            (
                "sync.min_ratio_rprims_non_varying",
                s.min_ratio_rprims_non_varying,
            ),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{ratio} is outside [0, 1]"),
                });
            }
        }
        Ok(())
    }
}
