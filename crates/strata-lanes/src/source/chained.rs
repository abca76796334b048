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

//! Sources filled in by another source's resolution.

use super::{BufferSource, ResolveState};
use std::sync::OnceLock;
use strata_core::TupleType;

/// Output channel produced as a by-product of its parent source.
///
/// It cannot resolve on its own: the parent fills or fails it during its
/// own [`BufferSource::resolve`], and the commit loop treats the pair as
/// one unit of work.
#[derive(Debug)]
pub struct ChainedBufferSource {
    name: String,
    tuple_type: TupleType,
    data: OnceLock<Vec<u8>>,
    state: ResolveState,
}

impl ChainedBufferSource {
    /// Creates an empty, unresolved chained source.
    pub fn new(name: impl Into<String>, tuple_type: TupleType) -> Self {
        Self {
            name: name.into(),
            tuple_type,
            data: OnceLock::new(),
            state: ResolveState::new(),
        }
    }

    pub(crate) fn fill(&self, data: Vec<u8>) {
        if self.data.set(data).is_err() {
            log::error!("chained buffer '{}' filled twice", self.name);
            return;
        }
        self.state.set_resolved();
    }

    pub(crate) fn fail(&self) {
        self.state.set_resolve_error();
    }
}

impl BufferSource for ChainedBufferSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn tuple_type(&self) -> TupleType {
        self.tuple_type
    }

    fn data(&self) -> Option<&[u8]> {
        self.data.get().map(Vec::as_slice)
    }

    fn resolve(&self) -> bool {
        self.state.is_settled()
    }

    fn state(&self) -> &ResolveState {
        &self.state
    }
}
