use alloy_primitives::U160;
use core::{hint::black_box, ops::Shl};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use gridex_engine::prelude::*;

fn generate_boundary_inputs() -> Vec<i32> {
    let mut inputs = (-128..=128).map(|i| i * 997).collect::<Vec<_>>();

    // Add edge cases
    inputs.extend([MIN_BOUNDARY, MAX_BOUNDARY, 0, 1000, -1000]);

    inputs
}

fn generate_price_inputs() -> Vec<U160> {
    let mut inputs = (20u8..=159)
        .map(|i| U160::from(1).shl(i))
        .collect::<Vec<_>>();

    // Add edge cases
    inputs.extend([MIN_RATIO, MAX_RATIO, U160::from(Q96)]);

    inputs
}

fn get_price_x96_at_boundary_benchmark(c: &mut Criterion) {
    let inputs = generate_boundary_inputs();
    let mut group = c.benchmark_group("get_price_x96_at_boundary");
    group.throughput(Throughput::Elements(inputs.len() as u64));

    group.bench_function("engine", |b| {
        b.iter(|| {
            for boundary in &inputs {
                let _ = black_box(get_price_x96_at_boundary(*boundary));
            }
        })
    });

    group.finish();
}

fn get_boundary_at_price_x96_benchmark(c: &mut Criterion) {
    let inputs = generate_price_inputs();
    let mut group = c.benchmark_group("get_boundary_at_price_x96");
    group.throughput(Throughput::Elements(inputs.len() as u64));

    group.bench_function("engine", |b| {
        b.iter(|| {
            for price_x96 in &inputs {
                let _ = black_box(get_boundary_at_price_x96(*price_x96));
            }
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    get_price_x96_at_boundary_benchmark,
    get_boundary_at_price_x96_benchmark
);
criterion_main!(benches);
