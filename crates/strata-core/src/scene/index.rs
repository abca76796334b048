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

//! The scene-index boundary consumed by dirty-list construction.

use super::path::PrimPath;

/// Read access to the primitive index owned by the scene layer.
pub trait SceneIndex {
    /// Returns `true` if `id` belongs to the collection called `collection_name`.
    fn is_in_collection(&self, id: &PrimPath, collection_name: &str) -> bool;

    /// Returns every primitive id at or below `root`, sorted.
    fn rprim_subtree(&self, root: &PrimPath) -> Vec<PrimPath>;
}
