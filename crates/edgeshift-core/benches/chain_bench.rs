//! Criterion benchmarks for [`ScreenChain`] construction and lookups.
//!
//! Building the chain happens once at startup; lookups run on every pointer
//! motion sample and must stay far below a frame time.
//!
//! Run with:
//! ```bash
//! cargo bench --package edgeshift-core --bench chain_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use edgeshift_core::{ChainLayout, Edge, ScreenChain, ScreenGeometry};

fn destination_screens(n: usize) -> Vec<ScreenGeometry> {
    (0..n)
        .map(|i| ScreenGeometry::new(1920 + 640 * (i as u32 % 2), 1080))
        .collect()
}

fn east_layout() -> ChainLayout {
    ChainLayout {
        edge: Some(Edge::East),
        ..ChainLayout::default()
    }
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_build");
    let source = ScreenGeometry::new(3840, 2160);
    for n in [1usize, 2, 4] {
        let screens = destination_screens(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &screens, |b, screens| {
            b.iter(|| ScreenChain::build(black_box(source), black_box(screens), &east_layout()))
        });
    }
    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let chain = ScreenChain::build(
        ScreenGeometry::new(2560, 1440),
        &destination_screens(3),
        &east_layout(),
    )
    .expect("valid chain");

    c.bench_function("chain_lookup_sweep", |b| {
        b.iter(|| {
            for along in (0..2560).step_by(7) {
                black_box(chain.lookup(black_box(1), along));
                black_box(chain.map_across(1, along % 1440));
            }
        })
    });
}

criterion_group!(benches, bench_build, bench_lookup);
criterion_main!(benches);
