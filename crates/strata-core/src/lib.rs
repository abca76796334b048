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

//! # Strata Core
//!
//! Foundational crate containing the leaf value types and interface contracts
//! shared by the scene-sync and buffer aggregation layers: dirty bits, prim
//! paths, collections, buffer specs, and the resource backend boundary.

#![warn(missing_docs)]

pub mod config;
pub mod resource;
pub mod scene;
pub mod telemetry;
pub mod utils;

pub use config::{ConfigError, ResourceConfig, StrataConfig, SyncConfig};
pub use resource::{
    BackendCapabilities, BufferDescriptor, BufferId, BufferSpec, BufferUsage, ResourceBackend,
    ResourceError, ScalarType, TupleType, UsageHint,
};
pub use scene::{DirtyBits, PrimPath, RprimCollection, SceneIndex, TrackerError};
