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

use std::sync::Arc;
use strata_agents::{CommitError, ResourceRegistry};
use strata_core::telemetry::counters;
use strata_core::{BufferSpec, PrimPath, ResourceConfig, ScalarType, TupleType, UsageHint};
use strata_data::mesh::MeshTopology;
use strata_data::InterleavedRange;
use strata_infra::HostBackend;
use strata_lanes::{
    BufferSource, BufferSourceHandle, ChainedBufferSource, DerivedBufferSource, TriangleIndexBuilder,
    ValueBufferSource,
};
use strata_telemetry::TelemetryService;

fn int() -> TupleType {
    TupleType::new(ScalarType::Int32, 1)
}

fn float3() -> TupleType {
    TupleType::new(ScalarType::Float32, 3)
}

fn registry() -> (ResourceRegistry, Arc<HostBackend>) {
    let backend = Arc::new(HostBackend::new());
    let registry = ResourceRegistry::new(
        backend.clone(),
        &ResourceConfig::default(),
        Arc::new(TelemetryService::new()),
    );
    (registry, backend)
}

fn result_range(registry: &ResourceRegistry) -> Arc<InterleavedRange> {
    registry.allocate_storage_range(
        "computation",
        &[BufferSpec::from_tuple("result", int())],
        UsageHint::EMPTY,
    )
}

fn plus(input: BufferSourceHandle, n: i32) -> BufferSourceHandle {
    Arc::new(DerivedBufferSource::map(
        "result",
        int(),
        input,
        move |values: &[i32]| values.iter().map(|v| v + n).collect::<Vec<i32>>(),
    ))
}

fn read_i32(range: &InterleavedRange) -> i32 {
    bytemuck::pod_read_unaligned(&range.read_data("result").unwrap())
}

fn read_float3(range: &InterleavedRange, name: &str) -> [f32; 3] {
    bytemuck::pod_read_unaligned(&range.read_data(name).unwrap())
}

#[test]
fn test_dependency_order_does_not_matter() {
    for reversed in [false, true] {
        // --- 1. ARRANGE ---
        let (registry, _backend) = registry();
        let value: BufferSourceHandle = Arc::new(ValueBufferSource::new("value", int(), &[100i32]));
        let c1 = plus(value, 1);
        let c2 = plus(c1.clone(), 10);
        let (r1, r2) = (result_range(&registry), result_range(&registry));

        if reversed {
            registry.add_source(&r2, c2);
            registry.add_source(&r1, c1);
        } else {
            registry.add_source(&r1, c1);
            registry.add_source(&r2, c2);
        }

        // --- 2. ACT ---
        let report = registry.commit().unwrap();

        // --- 3. ASSERT ---
        assert_eq!(report.sources_resolved, 2);
        assert_eq!(read_i32(&r1), 101, "reversed = {reversed}");
        assert_eq!(read_i32(&r2), 111, "reversed = {reversed}");
    }
}

#[test]
fn test_three_deep_chain_in_reverse() {
    // --- 1. ARRANGE ---
    let (registry, _backend) = registry();
    let value: BufferSourceHandle = Arc::new(ValueBufferSource::new("value", int(), &[100i32]));
    let c1 = plus(value, 1);
    let c2 = plus(c1.clone(), 10);
    let c3 = plus(c2.clone(), 10);
    let ranges: Vec<_> = (0..3).map(|_| result_range(&registry)).collect();

    registry.add_source(&ranges[2], c3);
    registry.add_source(&ranges[1], c2);
    registry.add_source(&ranges[0], c1);

    // --- 2. ACT ---
    let report = registry.commit().unwrap();

    // --- 3. ASSERT ---
    assert_eq!(report.iterations, 3);
    let values: Vec<i32> = ranges.iter().map(|r| read_i32(r)).collect();
    assert_eq!(values, vec![101, 111, 121]);
    assert_eq!(
        registry.telemetry().counter(counters::BUFFER_SOURCES_RESOLVED),
        3
    );
}

#[test]
fn test_fan_out_resolves_in_one_commit() {
    // --- 1. ARRANGE ---
    let (registry, _backend) = registry();
    let value: BufferSourceHandle = Arc::new(ValueBufferSource::new("value", int(), &[100i32]));
    let c1 = plus(value, 1);
    let dependents: Vec<_> = (0..100)
        .map(|_| {
            let range = result_range(&registry);
            registry.add_source(&range, plus(c1.clone(), 10));
            range
        })
        .collect();
    let root = result_range(&registry);
    registry.add_source(&root, c1);

    // --- 2. ACT ---
    let report = registry.commit().unwrap();

    // --- 3. ASSERT ---
    assert_eq!(report.sources_resolved, 101);
    assert_eq!(read_i32(&root), 101);
    assert!(dependents.iter().all(|r| read_i32(r) == 111));
}

#[test]
fn test_merge_preserves_existing_channels() {
    // --- 1. ARRANGE ---
    let (registry, _backend) = registry();
    let points = BufferSpec::from_tuple("points", float3());
    let colors = BufferSpec::from_tuple("displayColor", float3());
    let normals = BufferSpec::from_tuple("normals", float3());

    let range = registry.allocate_storage_range("primvar", &[points.clone()], UsageHint::EMPTY);
    registry.add_source(
        &range,
        Arc::new(ValueBufferSource::new("points", float3(), &[[1.0f32, 2.0, 3.0]])),
    );
    registry.commit().unwrap();
    assert_eq!(read_float3(&range, "points"), [1.0, 2.0, 3.0]);

    // --- 2. ACT ---
    // Adding colors moves {points} into a {points, displayColor} range.
    let with_colors = registry.update_storage_range(
        "primvar",
        Some(&range),
        &[colors.clone()],
        &[],
        UsageHint::EMPTY,
    );
    registry.add_source(
        &with_colors,
        Arc::new(ValueBufferSource::new("displayColor", float3(), &[[0.5f32, 0.25, 1.0]])),
    );
    drop(range);
    let report = registry.commit().unwrap();

    // --- 3. ASSERT ---
    assert_eq!(report.computations_committed, 1);
    assert_eq!(read_float3(&with_colors, "points"), [1.0, 2.0, 3.0]);
    assert_eq!(read_float3(&with_colors, "displayColor"), [0.5, 0.25, 1.0]);
    assert_eq!(
        registry
            .telemetry()
            .counter(counters::BUFFER_ARRAY_RANGE_MIGRATED),
        1
    );

    // --- 2. ACT ---
    // Re-specifying {points, displayColor} with normals only keeps both
    // existing channels and adds the new one.
    let old_version = with_colors.version();
    let with_normals = registry.update_storage_range(
        "primvar",
        Some(&with_colors),
        &[normals.clone()],
        &[],
        UsageHint::EMPTY,
    );
    registry.add_source(
        &with_normals,
        Arc::new(ValueBufferSource::new("normals", float3(), &[[0.0f32, 0.0, 1.0]])),
    );
    assert!(with_colors.version() > old_version);
    drop(with_colors);
    let report = registry.commit().unwrap();

    // --- 3. ASSERT ---
    assert_eq!(report.computations_committed, 2);
    let mut names: Vec<String> = with_normals
        .buffer_specs()
        .into_iter()
        .map(|spec| spec.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["displayColor", "normals", "points"]);
    assert_eq!(read_float3(&with_normals, "points"), [1.0, 2.0, 3.0]);
    assert_eq!(read_float3(&with_normals, "displayColor"), [0.5, 0.25, 1.0]);
    assert_eq!(read_float3(&with_normals, "normals"), [0.0, 0.0, 1.0]);
    assert_eq!(
        registry
            .telemetry()
            .counter(counters::BUFFER_ARRAY_RANGE_MIGRATED),
        2
    );

    // Updating a channel the range already has keeps the range.
    let same = registry.update_storage_range(
        "primvar",
        Some(&with_normals),
        &[normals],
        &[],
        UsageHint::EMPTY,
    );
    assert!(Arc::ptr_eq(&same, &with_normals));
    registry.add_source(
        &same,
        Arc::new(ValueBufferSource::new("normals", float3(), &[[0.0f32, 1.0, 0.0]])),
    );
    registry.commit().unwrap();
    assert_eq!(read_float3(&same, "points"), [1.0, 2.0, 3.0]);
    assert_eq!(read_float3(&same, "displayColor"), [0.5, 0.25, 1.0]);
    assert_eq!(read_float3(&same, "normals"), [0.0, 1.0, 0.0]);
}

#[test]
fn test_removing_a_channel_migrates() {
    let (registry, _backend) = registry();
    let points = BufferSpec::from_tuple("points", float3());
    let widths = BufferSpec::from_tuple("widths", TupleType::new(ScalarType::Float32, 1));

    let range = registry.allocate_storage_range(
        "primvar",
        &[points.clone(), widths.clone()],
        UsageHint::EMPTY,
    );
    registry.add_source(
        &range,
        Arc::new(ValueBufferSource::new("points", float3(), &[[4.0f32, 5.0, 6.0]])),
    );
    registry.commit().unwrap();
    let old_version = range.version();

    let trimmed =
        registry.update_storage_range("primvar", Some(&range), &[], &[widths], UsageHint::EMPTY);
    registry.commit().unwrap();

    assert!(!Arc::ptr_eq(&trimmed, &range));
    assert_eq!(trimmed.buffer_specs(), vec![points]);
    assert_eq!(read_float3(&trimmed, "points"), [4.0, 5.0, 6.0]);
    assert!(range.version() > old_version);
}

#[test]
fn test_stalled_resolution_fails_the_commit() {
    // --- 1. ARRANGE ---
    let (registry, _backend) = registry();
    let orphan: BufferSourceHandle = Arc::new(ChainedBufferSource::new("orphan", int()));
    let range = result_range(&registry);
    registry.add_source(&range, plus(orphan, 1));

    // --- 2. ACT ---
    let result = registry.commit();

    // --- 3. ASSERT ---
    assert!(matches!(
        result,
        Err(CommitError::Stalled { unresolved: 1, .. })
    ));
    assert_eq!(registry.pending_source_count(), 0);
    assert!(registry.commit().is_ok());
}

#[test]
fn test_failed_source_is_skipped() {
    // --- 1. ARRANGE ---
    let (registry, _backend) = registry();
    let broken = Arc::new(TriangleIndexBuilder::new(
        PrimPath::new("/broken"),
        Arc::new(MeshTopology::new(vec![4], vec![0, 1, 2])),
    ));
    registry.add_standalone_source(broken.clone());
    let range = result_range(&registry);
    registry.add_source(&range, Arc::new(ValueBufferSource::new("result", int(), &[7i32])));

    // --- 2. ACT ---
    let report = registry.commit().unwrap();

    // --- 3. ASSERT ---
    assert_eq!(report.sources_resolved, 1);
    assert_eq!(report.sources_failed, 1);
    assert!(broken.primitive_param().has_resolve_error());
    assert_eq!(read_i32(&range), 7);
}

#[test]
fn test_invalid_sources_are_rejected_at_registration() {
    let (registry, _backend) = registry();
    let range = result_range(&registry);
    registry.add_source(
        &range,
        Arc::new(ValueBufferSource::from_bytes("result", int(), vec![0u8; 3])),
    );
    assert_eq!(registry.pending_source_count(), 0);
}

#[test]
fn test_garbage_collect_releases_dropped_ranges() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (registry, backend) = registry();
    let transform = BufferSpec::new("transform", ScalarType::Float32, 16, 1);
    let ranges: Vec<_> = (0..4)
        .map(|_| registry.allocate_uniform_range("constantPrimvar", &[transform.clone()], UsageHint::EMPTY))
        .collect();
    registry.commit()?;
    let before = registry.resource_allocation();
    assert_eq!(before.ubo_size, 4 * 256);
    assert_eq!(before.roles.get("constantPrimvar"), Some(&1024));

    // --- 2. ACT ---
    drop(ranges);
    registry.garbage_collect()?;

    // --- 3. ASSERT ---
    let after = registry.resource_allocation();
    assert_eq!(after.gpu_memory_used, 0);
    assert_eq!(
        registry.telemetry().counter(counters::GARBAGE_COLLECTED_UBO),
        1
    );
    assert_eq!(registry.uniform_buffer_arrays().buffer_array_count(), 0);
    assert_eq!(backend.stats().live_buffers, 0);

    let json = serde_json::to_string(&before)?;
    assert!(json.contains("\"ubo_size\":1024"));
    Ok(())
}
