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

//! A tiny in-memory scene and the delegate that syncs it.

use std::collections::BTreeMap;
use std::sync::Arc;
use strata_agents::{ResourceRegistry, RprimSync};
use strata_core::{BufferSpec, DirtyBits, PrimPath, ScalarType, SceneIndex, TupleType, UsageHint};
use strata_data::{InterleavedRange, MeshTopology};
use strata_lanes::{
    BufferSourceHandle, DerivedBufferSource, SmoothNormalsComputation, TriangleIndexBuilder,
    ValueBufferSource, VertexAdjacencyBuilder,
};

/// Authored data of one mesh prim.
pub struct MeshPrim {
    pub topology: Arc<MeshTopology>,
    pub points: Vec<[f32; 3]>,
    pub transform: [f32; 16],
    pub color: [f32; 4],
    pub opacity: Option<f32>,
}

/// Device-side state the delegate keeps per prim.
#[derive(Default)]
struct PrimResources {
    constant: Option<Arc<InterleavedRange>>,
    topology: Option<Arc<InterleavedRange>>,
    normals: Option<Arc<InterleavedRange>>,
    adjacency: Option<Arc<VertexAdjacencyBuilder>>,
}

/// The authored prims; doubles as the scene index.
#[derive(Default)]
pub struct Stage {
    prims: BTreeMap<PrimPath, MeshPrim>,
}

impl Stage {
    pub fn insert(&mut self, id: PrimPath, prim: MeshPrim) {
        self.prims.insert(id, prim);
    }

    pub fn remove(&mut self, id: &PrimPath) {
        self.prims.remove(id);
    }

    pub fn prim_mut(&mut self, id: &PrimPath) -> Option<&mut MeshPrim> {
        self.prims.get_mut(id)
    }
}

impl SceneIndex for Stage {
    fn is_in_collection(&self, id: &PrimPath, _collection_name: &str) -> bool {
        self.prims.contains_key(id)
    }

    fn rprim_subtree(&self, root: &PrimPath) -> Vec<PrimPath> {
        self.prims
            .keys()
            .filter(|id| id.has_prefix(root))
            .cloned()
            .collect()
    }
}

/// Ranges and producers owned on behalf of each prim.
pub struct SceneResources {
    registry: Arc<ResourceRegistry>,
    prims: BTreeMap<PrimPath, PrimResources>,
}

impl SceneResources {
    pub fn new(registry: Arc<ResourceRegistry>) -> Self {
        Self {
            registry,
            prims: BTreeMap::new(),
        }
    }

    /// Drops everything held for `id`; the registry reclaims it on the next
    /// garbage collection.
    pub fn remove(&mut self, id: &PrimPath) {
        self.prims.remove(id);
    }

    /// A delegate syncing `stage` into these resources.
    pub fn delegate<'a>(&'a mut self, stage: &'a Stage) -> SceneDelegate<'a> {
        SceneDelegate {
            stage,
            resources: self,
        }
    }

    /// The uploaded transform of `id`, read back from the device.
    pub fn device_transform(&self, id: &PrimPath) -> Option<[f32; 16]> {
        let range = self.prims.get(id)?.constant.as_ref()?;
        let bytes = range.read_data("transform").ok()?;
        Some(bytemuck::pod_read_unaligned(&bytes))
    }

    /// The uploaded triangle count of `id`'s topology.
    pub fn device_triangle_count(&self, id: &PrimPath) -> Option<i32> {
        let range = self.prims.get(id)?.topology.as_ref()?;
        let bytes = range.read_data("triangleCount").ok()?;
        Some(bytemuck::pod_read_unaligned(&bytes))
    }
}

/// Pulls prim data from a [`Stage`] into a [`SceneResources`].
pub struct SceneDelegate<'a> {
    stage: &'a Stage,
    resources: &'a mut SceneResources,
}

impl SceneDelegate<'_> {
    fn constant_specs(prim: &MeshPrim) -> Vec<BufferSpec> {
        let mut specs = vec![
            BufferSpec::new("transform", ScalarType::Float32, 16, 1),
            BufferSpec::new("displayColor", ScalarType::Float32, 4, 1),
        ];
        if prim.opacity.is_some() {
            specs.push(BufferSpec::new("displayOpacity", ScalarType::Float32, 1, 1));
        }
        specs
    }

    fn sync_constants(&mut self, id: &PrimPath) {
        let Some(prim) = self.stage.prims.get(id) else {
            return;
        };
        let registry = &self.resources.registry;
        let resources = self.resources.prims.entry(id.clone()).or_default();
        let specs = Self::constant_specs(prim);
        let range = registry.update_uniform_range(
            "constantPrimvar",
            resources.constant.as_ref(),
            &specs,
            &[],
            UsageHint::EMPTY,
        );

        let mut sources: Vec<BufferSourceHandle> = vec![
            Arc::new(ValueBufferSource::new(
                "transform",
                TupleType::new(ScalarType::Float32, 16),
                &[prim.transform],
            )),
            Arc::new(ValueBufferSource::new(
                "displayColor",
                TupleType::new(ScalarType::Float32, 4),
                &[prim.color],
            )),
        ];
        if let Some(opacity) = prim.opacity {
            sources.push(Arc::new(ValueBufferSource::new(
                "displayOpacity",
                TupleType::new(ScalarType::Float32, 1),
                &[opacity],
            )));
        }
        registry.add_sources(&range, sources);
        resources.constant = Some(range);
    }

    fn sync_topology(&mut self, id: &PrimPath) {
        let Some(prim) = self.stage.prims.get(id) else {
            return;
        };
        let registry = &self.resources.registry;
        let hash = prim.topology.compute_hash();

        // Topology shared across prims with identical face data.
        let topology = {
            let mut instance = registry.register_mesh_topology(hash);
            if instance.is_first_instance() {
                instance.set_value(prim.topology.clone());
            }
            instance
                .value()
                .cloned()
                .unwrap_or_else(|| prim.topology.clone())
        };

        let range = {
            let mut instance = registry.register_mesh_index_range(hash, "triangleCount");
            if instance.is_first_instance() {
                let range = registry.allocate_storage_range(
                    "topology",
                    &[BufferSpec::new("triangleCount", ScalarType::Int32, 1, 1)],
                    UsageHint::IMMUTABLE,
                );
                let builder = Arc::new(TriangleIndexBuilder::new(id.clone(), topology.clone()));
                registry.add_standalone_source(builder.clone());
                registry.add_source(
                    &range,
                    Arc::new(DerivedBufferSource::map(
                        "triangleCount",
                        TupleType::new(ScalarType::Int32, 1),
                        builder,
                        |triangles: &[[i32; 3]]| vec![triangles.len() as i32],
                    )),
                );
                instance.set_value(range);
            }
            instance.value().cloned()
        };

        let adjacency = {
            let mut instance = registry.register_vertex_adjacency(hash);
            if instance.is_first_instance() {
                let builder = Arc::new(VertexAdjacencyBuilder::new(topology));
                registry.add_standalone_source(builder.clone());
                instance.set_value(builder);
            }
            instance.value().cloned()
        };

        let resources = self.resources.prims.entry(id.clone()).or_default();
        resources.topology = range;
        resources.adjacency = adjacency;
    }

    fn sync_points(&mut self, id: &PrimPath) {
        let Some(prim) = self.stage.prims.get(id) else {
            return;
        };
        let registry = &self.resources.registry;
        let resources = self.resources.prims.entry(id.clone()).or_default();
        let Some(adjacency) = resources.adjacency.clone() else {
            log::warn!("{id}: points synced before topology");
            return;
        };

        let points: BufferSourceHandle = Arc::new(ValueBufferSource::new(
            "points",
            TupleType::new(ScalarType::Float32, 3),
            &prim.points,
        ));
        let normals: BufferSourceHandle =
            Arc::new(SmoothNormalsComputation::new(adjacency, points, "normals"));
        registry.add_standalone_source(normals.clone());

        let range = resources.normals.get_or_insert_with(|| {
            registry.allocate_storage_range(
                "primvar",
                &[BufferSpec::new("averageNormal", ScalarType::Float32, 3, 1)],
                UsageHint::EMPTY,
            )
        });
        registry.add_source(
            range,
            Arc::new(DerivedBufferSource::map(
                "averageNormal",
                TupleType::new(ScalarType::Float32, 3),
                normals,
                average,
            )),
        );
    }
}

fn average(normals: &[[f32; 3]]) -> Vec<[f32; 3]> {
    let mut sum = [0.0f32; 3];
    for n in normals {
        for (s, c) in sum.iter_mut().zip(n) {
            *s += c;
        }
    }
    let len = sum.iter().map(|c| c * c).sum::<f32>().sqrt();
    if len > 0.0 {
        sum.iter_mut().for_each(|c| *c /= len);
    }
    vec![sum]
}

impl RprimSync for SceneDelegate<'_> {
    fn sync_rprim(&mut self, id: &PrimPath, dirty_bits: DirtyBits) -> DirtyBits {
        if dirty_bits.contains(DirtyBits::DIRTY_TOPOLOGY) {
            self.sync_topology(id);
        }
        if dirty_bits.intersects(DirtyBits::DIRTY_POINTS.with(DirtyBits::DIRTY_TOPOLOGY)) {
            self.sync_points(id);
        }
        if dirty_bits.intersects(
            DirtyBits::DIRTY_TRANSFORM
                .with(DirtyBits::DIRTY_PRIMVAR)
                .with(DirtyBits::DIRTY_TOPOLOGY),
        ) {
            self.sync_constants(id);
        }
        DirtyBits::CLEAN
    }
}

/// Two triangles per face of a unit cube, authored as quads.
pub fn cube() -> (Arc<MeshTopology>, Vec<[f32; 3]>) {
    let topology = MeshTopology::new(
        vec![4; 6],
        vec![
            0, 3, 2, 1, 4, 5, 6, 7, 0, 1, 5, 4, 1, 2, 6, 5, 2, 3, 7, 6, 3, 0, 4, 7,
        ],
    );
    let points = vec![
        [-0.5, -0.5, -0.5],
        [0.5, -0.5, -0.5],
        [0.5, 0.5, -0.5],
        [-0.5, 0.5, -0.5],
        [-0.5, -0.5, 0.5],
        [0.5, -0.5, 0.5],
        [0.5, 0.5, 0.5],
        [-0.5, 0.5, 0.5],
    ];
    (Arc::new(topology), points)
}

/// A single upward-facing quad.
pub fn quad() -> (Arc<MeshTopology>, Vec<[f32; 3]>) {
    let topology = MeshTopology::new(vec![4], vec![0, 1, 2, 3]);
    let points = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]];
    (Arc::new(topology), points)
}

pub fn translation(x: f32, y: f32, z: f32) -> [f32; 16] {
    [
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        x, y, z, 1.0,
    ]
}
