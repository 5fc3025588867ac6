use alloy_primitives::{keccak256, U160, U256};
use core::hint::black_box;
use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use gridex_engine::prelude::*;

const RESOLUTION: i32 = Resolution::MEDIUM as i32;

fn pseudo_random(seed: u64) -> U256 {
    keccak256(seed.to_be_bytes()).into()
}

fn is_initialized(bitmap: &BoundaryBitmap, boundary: i32) -> bool {
    let (word_pos, bit_pos) = position(boundary, RESOLUTION);
    bitmap.get_word(word_pos).bit(bit_pos as usize)
}

/// A bitmap with a bucket set roughly every 40 boundaries around zero.
fn generate_bitmap() -> BoundaryBitmap {
    let mut bitmap = BoundaryBitmap::default();
    for i in 0u64..500 {
        let offset = (pseudo_random(i).as_limbs()[0] % 16) as i32 * RESOLUTION;
        let boundary = (i as i32 - 250) * 8 * RESOLUTION + offset;
        if !is_initialized(&bitmap, boundary) {
            bitmap.flip_boundary(boundary, RESOLUTION);
        }
    }
    bitmap
}

fn generate_boundaries() -> Vec<i32> {
    (-100..100).map(|i| i * 97).collect()
}

fn flip_boundary_benchmark(c: &mut Criterion) {
    let boundaries = generate_boundaries()
        .into_iter()
        .map(|boundary| boundary.div_euclid(RESOLUTION) * RESOLUTION)
        .collect::<Vec<_>>();
    let mut group = c.benchmark_group("flip_boundary");
    group.throughput(Throughput::Elements(boundaries.len() as u64));

    group.bench_function("engine", |b| {
        b.iter(|| {
            let mut bitmap = BoundaryBitmap::default();
            for boundary in &boundaries {
                bitmap.flip_boundary(*boundary, RESOLUTION);
            }
            black_box(bitmap)
        })
    });

    group.finish();
}

fn next_initialized_boundary_benchmark(c: &mut Criterion) {
    let bitmap = generate_bitmap();
    let inputs = generate_boundaries()
        .into_iter()
        .filter_map(|boundary| {
            let price_x96 = get_price_x96_at_boundary(boundary).ok()?;
            Some((boundary, price_x96))
        })
        .collect::<Vec<(i32, U160)>>();
    let mut group = c.benchmark_group("next_initialized_boundary");
    group.throughput(Throughput::Elements(2 * inputs.len() as u64));

    group.bench_function("engine", |b| {
        b.iter(|| {
            for (boundary, price_x96) in &inputs {
                let boundary_lower = get_boundary_lower_at_boundary(*boundary, RESOLUTION);
                let current_initialized = is_initialized(&bitmap, boundary_lower);
                for lte in [true, false] {
                    let _ = black_box(bitmap.next_initialized_boundary(
                        *boundary,
                        *price_x96,
                        current_initialized,
                        boundary_lower,
                        RESOLUTION,
                        lte,
                    ));
                }
            }
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    flip_boundary_benchmark,
    next_initialized_boundary_benchmark
);
criterion_main!(benches);
