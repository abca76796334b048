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


//! Content-addressed deduplication of shared per-primitive data.
//!
//! Primitives with identical topology (or identical buffer ranges) share one
//! value keyed by a content hash. Entries live exactly as long as some holder
//! outside the registry keeps the shared value alive.

use ahash::AHashMap;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// A scoped handle onto one registry entry.
///
/// Holds the registry's insertion lock for as long as it lives, so the caller
/// can populate a freshly created entry before another thread observes it.
pub struct Instance<'a, K, V> {
    key: K,
    value: Option<Arc<V>>,
    is_first_instance: bool,
    registry: &'a InstanceRegistry<K, V>,
    _lock: MutexGuard<'a, ()>,
}

impl<'a, K, V> Instance<'a, K, V>
where
    K: Hash + Eq + Clone,
{
    /// The content key of this entry.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The shared value, or `None` if the entry was just created.
    pub fn value(&self) -> Option<&Arc<V>> {
        self.value.as_ref()
    }

    /// `true` if this call created the entry.
    pub fn is_first_instance(&self) -> bool {
        self.is_first_instance
    }

    /// Stores `value` and writes it back into the registry under the same key.
    pub fn set_value(&mut self, value: Arc<V>) {
        self.registry
            .dictionary
            .write()
            .insert(self.key.clone(), Some(value.clone()));
        self.value = Some(value);
    }
}

impl<K: fmt::Debug, V> fmt::Debug for Instance<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("key", &self.key)
            .field("has_value", &self.value.is_some())
            .field("is_first_instance", &self.is_first_instance)
            .finish()
    }
}

/// A concurrent map from content keys to shared values.
///
/// Lookups only take the map's read lock and never contend with each other.
/// The lookup-then-insert sequence of [`InstanceRegistry::get_instance`] and
/// [`InstanceRegistry::find_instance`] is serialized by a separate mutex.
pub struct InstanceRegistry<K, V> {
    dictionary: RwLock<AHashMap<K, Option<Arc<V>>>>,
    reg_lock: Mutex<()>,
}

impl<K, V> InstanceRegistry<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            dictionary: RwLock::new(AHashMap::new()),
            reg_lock: Mutex::new(()),
        }
    }

    /// Returns the entry for `key`, creating an empty one if absent.
    ///
    /// # Deadlocks
    ///
    /// The returned [`Instance`] holds the registry's insertion lock until it
    /// is dropped. Calling `get_instance`, `find_instance`, `garbage_collect`
    /// or `invalidate` on the same registry from the same thread while an
    /// `Instance` is alive deadlocks; [`InstanceRegistry::lookup`] does not
    /// take the lock and is safe to call.
    pub fn get_instance(&self, key: K) -> Instance<'_, K, V> {
        let lock = self.reg_lock.lock();
        let existing = self.dictionary.read().get(&key).cloned();
        let (value, is_first_instance) = match existing {
            Some(value) => (value, false),
            None => {
                self.dictionary.write().insert(key.clone(), None);
                (None, true)
            }
        };
        Instance {
            key,
            value,
            is_first_instance,
            registry: self,
            _lock: lock,
        }
    }

    /// Returns the entry for `key` without creating one.
    ///
    /// Holds the insertion lock like [`InstanceRegistry::get_instance`].
    pub fn find_instance(&self, key: K) -> Option<Instance<'_, K, V>> {
        let lock = self.reg_lock.lock();
        let value = self.dictionary.read().get(&key).cloned()?;
        Some(Instance {
            key,
            value,
            is_first_instance: false,
            registry: self,
            _lock: lock,
        })
    }

    /// Reads the shared value for `key` without taking the insertion lock.
    pub fn lookup(&self, key: &K) -> Option<Arc<V>> {
        self.dictionary.read().get(key).cloned().flatten()
    }

    /// Removes every entry whose value is no longer held outside the registry.
    ///
    /// Entries that were created but never populated are removed too.
    /// Returns the number of remaining entries.
    pub fn garbage_collect(&self) -> usize {
        let _lock = self.reg_lock.lock();
        let mut dictionary = self.dictionary.write();
        dictionary.retain(|_, value| match value {
            Some(value) => Arc::strong_count(value) > 1,
            None => false,
        });
        dictionary.len()
    }

    /// Drops every entry regardless of outside holders.
    pub fn invalidate(&self) {
        let _lock = self.reg_lock.lock();
        self.dictionary.write().clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.dictionary.read().len()
    }

    /// Returns `true` if the registry holds no entries.
    pub fn is_empty(&self) -> bool {
        self.dictionary.read().is_empty()
    }
}

impl<K, V> Default for InstanceRegistry<K, V>
where
    K: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for InstanceRegistry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceRegistry")
            .field("len", &self.dictionary.read().len())
            .finish()
    }
}
