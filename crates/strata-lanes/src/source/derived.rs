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

//! A source computed on the host from other sources.

use super::{input_status, BufferSource, BufferSourceHandle, InputStatus, ResolveState};
use std::fmt;
use std::sync::OnceLock;
use strata_core::TupleType;

type DeriveFn = dyn Fn(&[&[u8]]) -> Option<Vec<u8>> + Send + Sync;

/// Applies a function to the data of its inputs once they have all resolved.
///
/// The function receives the input bytes in input order and returns the
/// produced bytes, or `None` to report a resolve error. A failed input fails
/// the derived source too.
pub struct DerivedBufferSource {
    name: String,
    tuple_type: TupleType,
    inputs: Vec<BufferSourceHandle>,
    derive: Box<DeriveFn>,
    data: OnceLock<Vec<u8>>,
    state: ResolveState,
}

impl DerivedBufferSource {
    /// Creates a source computed from raw input bytes.
    pub fn new<F>(
        name: impl Into<String>,
        tuple_type: TupleType,
        inputs: Vec<BufferSourceHandle>,
        derive: F,
    ) -> Self
    where
        F: Fn(&[&[u8]]) -> Option<Vec<u8>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            tuple_type,
            inputs,
            derive: Box::new(derive),
            data: OnceLock::new(),
            state: ResolveState::new(),
        }
    }

    /// Creates a source that maps the typed values of a single input.
    pub fn map<T, U, F>(
        name: impl Into<String>,
        tuple_type: TupleType,
        input: BufferSourceHandle,
        f: F,
    ) -> Self
    where
        T: bytemuck::Pod,
        U: bytemuck::Pod,
        F: Fn(&[T]) -> Vec<U> + Send + Sync + 'static,
    {
        Self::new(name, tuple_type, vec![input], move |inputs| {
            let bytes = inputs.first()?;
            if bytes.len() % std::mem::size_of::<T>() != 0 {
                return None;
            }
            let values: Vec<T> = bytemuck::pod_collect_to_vec(bytes);
            Some(bytemuck::cast_slice(&f(&values)).to_vec())
        })
    }

    /// The sources this one depends on.
    pub fn inputs(&self) -> &[BufferSourceHandle] {
        &self.inputs
    }
}

impl BufferSource for DerivedBufferSource {
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
        match input_status(&self.inputs) {
            InputStatus::Pending => return false,
            InputStatus::Failed => {
                if self.state.try_lock() {
                    log::warn!("'{}': an input failed to resolve", self.name);
                    self.state.set_resolve_error();
                }
                return self.state.is_settled();
            }
            InputStatus::Ready => {}
        }

        if !self.state.try_lock() {
            return self.state.is_settled();
        }

        let inputs: Vec<&[u8]> = self.inputs.iter().filter_map(|input| input.data()).collect();
        let element_size = self.tuple_type.byte_size().max(1);
        match (self.derive)(&inputs) {
            Some(bytes) if bytes.len() % element_size == 0 => {
                let _ = self.data.set(bytes);
                self.state.set_resolved();
            }
            Some(bytes) => {
                log::warn!(
                    "'{}': produced {} bytes, not a multiple of {element_size}",
                    self.name,
                    bytes.len()
                );
                self.state.set_resolve_error();
            }
            None => {
                log::warn!("'{}': computation failed", self.name);
                self.state.set_resolve_error();
            }
        }
        true
    }

    fn state(&self) -> &ResolveState {
        &self.state
    }
}

impl fmt::Debug for DerivedBufferSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedBufferSource")
            .field("name", &self.name)
            .field("tuple_type", &self.tuple_type)
            .field("inputs", &self.inputs.len())
            .field("state", &self.state)
            .finish()
    }
}
