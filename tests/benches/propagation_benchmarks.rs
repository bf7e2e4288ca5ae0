//! # Composition Engine Benchmarks
//!
//! | Scenario | Work per iteration |
//! |----------|--------------------|
//! | Deep chain, leaf cost update | every ancestor, one per level |
//! | Wide fan-in, leaf cost update | one parent with N edges |
//! | Shared leaf, leaf cost update | N direct dependents |
//! | Create with dependencies | validation of a fresh subgraph |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use cs_01_composition_engine::{
    CompositionApi, CompositionId, CompositionPatch, CompositionService, NewComposition, Quantity,
};
use std::time::Duration;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

fn unit() -> Quantity {
    Quantity::new(1.0, "u")
}

/// n0 <- n1 <- ... <- n{depth}
async fn build_chain(depth: usize) -> CompositionService {
    let service = CompositionService::in_memory();
    service
        .create(NewComposition::new(unit()).with_id("n0").with_cost(1.0))
        .await
        .unwrap();
    for i in 1..=depth {
        service
            .create(
                NewComposition::new(unit())
                    .with_id(format!("n{i}"))
                    .with_dependency(format!("n{}", i - 1), unit()),
            )
            .await
            .unwrap();
    }
    service
}

/// `width` leaves feeding a single parent
async fn build_fan_in(width: usize) -> CompositionService {
    let service = CompositionService::in_memory();
    let mut parent = NewComposition::new(unit()).with_id("parent");
    for i in 0..width {
        let id = format!("leaf{i}");
        service
            .create(NewComposition::new(unit()).with_id(id.clone()).with_cost(1.0))
            .await
            .unwrap();
        parent = parent.with_dependency(id, unit());
    }
    service.create(parent).await.unwrap();
    service
}

/// One leaf used by `width` parents
async fn build_fan_out(width: usize) -> CompositionService {
    let service = CompositionService::in_memory();
    service
        .create(NewComposition::new(unit()).with_id("leaf").with_cost(1.0))
        .await
        .unwrap();
    for i in 0..width {
        service
            .create(
                NewComposition::new(unit())
                    .with_id(format!("parent{i}"))
                    .with_dependency("leaf", unit()),
            )
            .await
            .unwrap();
    }
    service
}

// ============================================================================
// Propagation
// ============================================================================

fn bench_chain_propagation(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("propagation-chain");
    group.measurement_time(Duration::from_secs(10));

    for depth in [10, 100, 1000] {
        let service = rt.block_on(build_chain(depth));
        let leaf = CompositionId::new("n0");
        let mut cost = 1.0;

        group.throughput(Throughput::Elements(depth as u64));
        group.bench_with_input(BenchmarkId::new("leaf_update", depth), &depth, |b, _| {
            b.iter(|| {
                cost += 1.0;
                let committed = rt
                    .block_on(
                        service.update(&leaf, CompositionPatch::default().with_cost(cost)),
                    )
                    .unwrap();
                black_box(committed.recomputed.len())
            })
        });
    }

    group.finish();
}

fn bench_fan_in_propagation(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("propagation-fan-in");

    for width in [10, 100, 500] {
        let service = rt.block_on(build_fan_in(width));
        let leaf = CompositionId::new("leaf0");
        let mut cost = 1.0;

        group.bench_with_input(BenchmarkId::new("leaf_update", width), &width, |b, _| {
            b.iter(|| {
                cost += 1.0;
                rt.block_on(service.update(&leaf, CompositionPatch::default().with_cost(cost)))
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_fan_out_propagation(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("propagation-fan-out");

    for width in [10, 100, 1000] {
        let service = rt.block_on(build_fan_out(width));
        let leaf = CompositionId::new("leaf");
        let mut cost = 1.0;

        group.throughput(Throughput::Elements(width as u64));
        group.bench_with_input(BenchmarkId::new("leaf_update", width), &width, |b, _| {
            b.iter(|| {
                cost += 1.0;
                rt.block_on(service.update(&leaf, CompositionPatch::default().with_cost(cost)))
                    .unwrap()
            })
        });
    }

    group.finish();
}

// ============================================================================
// Creation
// ============================================================================

fn bench_create(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("create");

    for deps in [1, 10, 100] {
        let service = rt.block_on(build_fan_in(deps));
        let mut next = 0u64;

        group.bench_with_input(BenchmarkId::new("with_dependencies", deps), &deps, |b, &deps| {
            b.iter(|| {
                next += 1;
                let mut request = NewComposition::new(unit()).with_id(format!("new{next}"));
                for i in 0..deps {
                    request = request.with_dependency(format!("leaf{i}"), unit());
                }
                black_box(rt.block_on(service.create(request)).unwrap())
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_chain_propagation,
    bench_fan_in_propagation,
    bench_fan_out_propagation,
    bench_create,
);
criterion_main!(benches);
