use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::sync::Arc;
use strata_core::{BufferSpec, ResourceConfig, ScalarType, TupleType, UsageHint};
use strata_data::{BufferArrayRegistry, InterleavedMemoryManager};
use strata_infra::HostBackend;
use strata_telemetry::TelemetryService;

fn specs() -> Vec<BufferSpec> {
    vec![
        BufferSpec::new("transform", ScalarType::Float32, 16, 1),
        BufferSpec::new("color", ScalarType::Float32, 4, 1),
        BufferSpec::new("primId", ScalarType::Int32, 1, 1),
    ]
}

fn registry() -> BufferArrayRegistry {
    let backend = Arc::new(HostBackend::new());
    let telemetry = Arc::new(TelemetryService::new());
    BufferArrayRegistry::new(InterleavedMemoryManager::storage(
        backend,
        &ResourceConfig::default(),
        telemetry,
    ))
}

fn bench_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Striped Interleaved Aggregation");

    group.bench_function("Allocate + Reallocate (10k rows)", |b| {
        b.iter(|| {
            let registry = registry();
            let ranges: Vec<_> = (0..10_000)
                .map(|_| registry.allocate_range("constantPrimvar", &specs(), UsageHint::EMPTY))
                .collect();
            registry.reallocate_all().unwrap();
            black_box(ranges.len());
        });
    });

    group.bench_function("Compact after dropping every other row (10k rows)", |b| {
        b.iter_with_setup(
            || {
                let registry = registry();
                let ranges: Vec<_> = (0..10_000)
                    .map(|_| registry.allocate_range("constantPrimvar", &specs(), UsageHint::EMPTY))
                    .collect();
                registry.reallocate_all().unwrap();
                let kept: Vec<_> = ranges.into_iter().step_by(2).collect();
                (registry, kept)
            },
            |(registry, kept)| {
                registry.garbage_collect().unwrap();
                black_box(kept.len());
            },
        );
    });

    group.bench_function("Stage + flush contiguous writes (10k rows)", |b| {
        let registry = registry();
        let ranges: Vec<_> = (0..10_000)
            .map(|_| registry.allocate_range("constantPrimvar", &specs(), UsageHint::EMPTY))
            .collect();
        registry.reallocate_all().unwrap();
        let color = bytemuck::cast_slice::<f32, u8>(&[1.0, 0.5, 0.25, 1.0]).to_vec();
        let tuple = TupleType::new(ScalarType::Float32, 4);

        b.iter(|| {
            for range in &ranges {
                range.copy_data("color", tuple, &color).unwrap();
            }
            registry.flush().unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_aggregation);
criterion_main!(benches);
