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

//! Buffer specs, device buffer handles, and the backend contract.

pub mod backend;
pub mod buffer;
pub mod buffer_spec;
pub mod error;

pub use backend::{BackendCapabilities, ResourceBackend};
pub use buffer::{BufferDescriptor, BufferId, BufferUsage, UsageHint};
pub use buffer_spec::{BufferSpec, ScalarType, TupleType};
pub use error::ResourceError;
