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

//! # Strata Agents
//!
//! The drivers of the aggregation layer. The [`ResourceRegistry`] collects
//! producer work, resolves it to a fixed point, and uploads the results into
//! striped aggregates. The [`SyncAgent`] walks a collection's dirty list each
//! frame and hands dirty primitives to the scene delegate.

#![warn(missing_docs)]

pub mod resource_agent;
pub mod sync_agent;

pub use resource_agent::{CommitError, CommitReport, ResourceAllocation, ResourceRegistry};
pub use sync_agent::{RprimSync, SyncAgent, SyncError, SyncReport};
