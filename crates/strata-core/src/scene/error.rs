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

//! Caller-contract violations reported by change tracking.

use super::path::PrimPath;
use std::fmt;

/// A caller-contract violation detected by the change tracker.
///
/// The offending call is a no-op; callers may log and continue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// A mark operation was given the all-zero clean mask.
    CleanBits {
        /// The operation that received the clean mask.
        operation: &'static str,
    },
    /// The primitive id is not tracked.
    UnknownPrim(PrimPath),
    /// The instancer id is not tracked.
    UnknownInstancer(PrimPath),
    /// The collection name was never added.
    UnknownCollection(String),
    /// The general state name was never added.
    UnknownState(String),
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::CleanBits { operation } => {
                write!(f, "{operation} called with clean dirty bits")
            }
            TrackerError::UnknownPrim(id) => write!(f, "Primitive is not tracked: {id}"),
            TrackerError::UnknownInstancer(id) => write!(f, "Instancer is not tracked: {id}"),
            TrackerError::UnknownCollection(name) => {
                write!(f, "Collection is not tracked: {name}")
            }
            TrackerError::UnknownState(name) => write!(f, "State is not tracked: {name}"),
        }
    }
}

impl std::error::Error for TrackerError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_error_display() {
        let err = TrackerError::CleanBits {
            operation: "mark_rprim_dirty",
        };
        assert_eq!(format!("{err}"), "mark_rprim_dirty called with clean dirty bits");

        let err = TrackerError::UnknownPrim(PrimPath::new("/world/cube"));
        assert_eq!(format!("{err}"), "Primitive is not tracked: /world/cube");
    }
}
