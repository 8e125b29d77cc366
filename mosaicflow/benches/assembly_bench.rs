//! Benchmarks for sub-workflow assembly and download ordering.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mosaicflow::catalog::ResultSet;
use mosaicflow::pipeline::{build_fanout, build_mosaic_pipeline, FanoutWidth};
use mosaicflow::stages::order_candidates;
use mosaicflow::testing::fixtures::{at_hour, mosaic_config, record};

fn assembly_benchmark(c: &mut Criterion) {
    let config = mosaic_config();
    let mut group = c.benchmark_group("build_mosaic_pipeline");
    for count in [1i64, 16, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| build_mosaic_pipeline(black_box(count), &config));
        });
    }
    group.finish();

    c.bench_function("build_fanout_9", |b| {
        b.iter(|| build_fanout(black_box(FanoutWidth::Fixed(9)), "message"));
    });
}

fn ordering_benchmark(c: &mut Criterion) {
    let results: ResultSet = (0..1000u32)
        .map(|i| record(&format!("product-{i:04}"), at_hour(i % 24)))
        .collect();

    c.bench_function("order_candidates_1000", |b| {
        b.iter(|| order_candidates(black_box(&results)));
    });
}

criterion_group!(benches, assembly_benchmark, ordering_benchmark);
criterion_main!(benches);
