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

//! Named, root-path-delimited sets of primitives.

use super::path::PrimPath;

/// A named working set of primitives, delimited by root paths.
///
/// Root paths are kept sorted with duplicates and nested roots removed, so
/// two collections naming the same subtrees compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RprimCollection {
    name: String,
    repr_selector: String,
    root_paths: Vec<PrimPath>,
}

impl RprimCollection {
    /// Creates a collection rooted at the absolute root.
    pub fn new(name: impl Into<String>, repr_selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repr_selector: repr_selector.into(),
            root_paths: vec![PrimPath::absolute_root()],
        }
    }

    /// Replaces the root paths, returning the updated collection.
    pub fn with_root_paths(mut self, root_paths: Vec<PrimPath>) -> Self {
        self.set_root_paths(root_paths);
        self
    }

    /// Replaces the root paths. An empty list matches nothing.
    pub fn set_root_paths(&mut self, mut root_paths: Vec<PrimPath>) {
        root_paths.sort();
        root_paths.dedup();
        let mut normalized: Vec<PrimPath> = Vec::with_capacity(root_paths.len());
        for path in root_paths {
            match normalized.last() {
                Some(last) if path.has_prefix(last) => {}
                _ => normalized.push(path),
            }
        }
        self.root_paths = normalized;
    }

    /// The collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The representation requested for members of this collection.
    pub fn repr_selector(&self) -> &str {
        &self.repr_selector
    }

    /// The normalized, sorted root paths.
    pub fn root_paths(&self) -> &[PrimPath] {
        &self.root_paths
    }

    /// Returns `true` if the only root is the absolute root.
    pub fn is_absolute_root(&self) -> bool {
        self.root_paths.len() == 1 && self.root_paths[0].is_absolute_root()
    }
}
