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


//! Errors raised by range data transfers.

use strata_core::{ResourceError, TupleType};

/// An error from a copy into, or read out of, an aggregate range.
#[derive(Debug, thiserror::Error)]
pub enum RangeError {
    /// The range is not assigned to any aggregate.
    #[error("range is not assigned to an aggregate")]
    Unassigned,
    /// The range is assigned but has no storage yet (never reallocated).
    #[error("range has no allocated storage")]
    InvalidRange,
    /// The aggregate has no field with this name.
    #[error("no buffer resource named '{0}'")]
    MissingResource(String),
    /// The data's element type does not match the field's.
    #[error("'{name}': element type {found:?} does not match {expected:?}")]
    TypeMismatch {
        /// Field name.
        name: String,
        /// The field's tuple type.
        expected: TupleType,
        /// The provided tuple type.
        found: TupleType,
    },
    /// Fewer bytes were provided than the range covers.
    #[error("'{name}': expected {expected} bytes, got {found}")]
    SizeMismatch {
        /// Field name.
        name: String,
        /// Bytes needed.
        expected: usize,
        /// Bytes provided.
        found: usize,
    },
    /// The backend rejected the transfer.
    #[error(transparent)]
    Resource(#[from] ResourceError),
}
