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

//! Hierarchical primitive identifiers.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// An absolute, `/`-separated path identifying a primitive in the scene.
///
/// Paths are cheap to clone. Ordering is component-wise, so a path always
/// sorts immediately before all of its descendants and every subtree forms
/// a contiguous run in a sorted list.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PrimPath(Arc<str>);

impl PrimPath {
    /// Creates a path, adding the leading `/` and dropping empty components.
    pub fn new(path: impl AsRef<str>) -> Self {
        let path = path.as_ref();
        let mut normalized = String::with_capacity(path.len() + 1);
        for component in path.split('/').filter(|c| !c.is_empty()) {
            normalized.push('/');
            normalized.push_str(component);
        }
        if normalized.is_empty() {
            normalized.push('/');
        }
        Self(Arc::from(normalized))
    }

    /// The root path `/`, which is a prefix of every path.
    pub fn absolute_root() -> Self {
        Self(Arc::from("/"))
    }

    /// Returns `true` for the root path `/`.
    pub fn is_absolute_root(&self) -> bool {
        &*self.0 == "/"
    }

    /// Returns the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if `prefix` is this path or one of its ancestors.
    pub fn has_prefix(&self, prefix: &PrimPath) -> bool {
        if prefix.is_absolute_root() {
            return true;
        }
        match self.0.strip_prefix(&*prefix.0) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Returns the parent path, or `None` for the root.
    pub fn parent(&self) -> Option<PrimPath> {
        if self.is_absolute_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(PrimPath::absolute_root()),
            Some(idx) => Some(Self(Arc::from(&self.0[..idx]))),
            None => None,
        }
    }

    /// Returns a child path with the given name appended.
    pub fn append_child(&self, name: &str) -> PrimPath {
        if self.is_absolute_root() {
            PrimPath::new(name)
        } else {
            PrimPath::new(format!("{}/{}", self.0, name))
        }
    }

    /// Returns the last component, or an empty string for the root.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }

    /// Iterates over the path components, root first.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|c| !c.is_empty())
    }
}

impl Ord for PrimPath {
    fn cmp(&self, other: &Self) -> Ordering {
        if Arc::ptr_eq(&self.0, &other.0) {
            return Ordering::Equal;
        }
        self.components().cmp(other.components())
    }
}

impl PartialOrd for PrimPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PrimPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PrimPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrimPath({})", self.0)
    }
}

impl From<&str> for PrimPath {
    fn from(value: &str) -> Self {
        PrimPath::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        assert_eq!(PrimPath::new("a/b/").as_str(), "/a/b");
        assert_eq!(PrimPath::new("//a//b").as_str(), "/a/b");
        assert!(PrimPath::new("").is_absolute_root());
        assert!(PrimPath::new("/").is_absolute_root());
    }

    #[test]
    fn test_has_prefix() {
        let a = PrimPath::new("/a");
        let ab = PrimPath::new("/a/b");
        let abc = PrimPath::new("/abc");
        assert!(ab.has_prefix(&a));
        assert!(a.has_prefix(&a));
        assert!(!abc.has_prefix(&a));
        assert!(abc.has_prefix(&PrimPath::absolute_root()));
        assert!(!a.has_prefix(&ab));
    }

    #[test]
    fn test_subtree_is_contiguous_when_sorted() {
        let mut paths: Vec<PrimPath> = ["/ab", "/a/c", "/a", "/b", "/a/b/d", "/a/b"]
            .iter()
            .map(|p| PrimPath::new(p))
            .collect();
        paths.sort();
        let sorted: Vec<&str> = paths.iter().map(|p| p.as_str()).collect();
        assert_eq!(sorted, vec!["/a", "/a/b", "/a/b/d", "/a/c", "/ab", "/b"]);
    }

    #[test]
    fn test_parent_and_child() {
        let ab = PrimPath::new("/a/b");
        assert_eq!(ab.parent(), Some(PrimPath::new("/a")));
        assert_eq!(PrimPath::new("/a").parent(), Some(PrimPath::absolute_root()));
        assert_eq!(PrimPath::absolute_root().parent(), None);
        assert_eq!(ab.append_child("c").as_str(), "/a/b/c");
        assert_eq!(PrimPath::absolute_root().append_child("x").as_str(), "/x");
        assert_eq!(ab.name(), "b");
    }
}
