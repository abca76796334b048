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

//! Errors raised at the resource backend boundary.

use super::buffer::BufferId;
use std::fmt;

/// Failure reported by a [`crate::ResourceBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// The buffer was destroyed or never created.
    InvalidHandle(BufferId),
    /// Backend-defined failure.
    BackendError(String),
    /// A read, write or copy reaching past the end of a buffer.
    OutOfBounds {
        /// The buffer being accessed.
        id: BufferId,
        /// First byte of the access.
        offset: u64,
        /// Length of the access in bytes.
        size: u64,
        /// Size of the buffer in bytes.
        capacity: u64,
    },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::InvalidHandle(id) => {
                write!(f, "unknown buffer {id:?}")
            }
            ResourceError::BackendError(msg) => {
                write!(f, "backend failure: {msg}")
            }
            ResourceError::OutOfBounds {
                id,
                offset,
                size,
                capacity,
            } => write!(
                f,
                "{size} bytes at offset {offset} overrun {id:?} of {capacity} bytes"
            ),
        }
    }
}

impl std::error::Error for ResourceError {}
