use alloy_primitives::{keccak256, I256, U160, U256};
use core::hint::black_box;
use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use gridex_engine::prelude::*;

fn pseudo_random(seed: u64) -> U256 {
    keccak256(seed.to_be_bytes()).into()
}

fn pseudo_random_128(seed: u64) -> u128 {
    let s = pseudo_random(seed);
    u128::from(s.as_limbs()[0]) | (u128::from(s.as_limbs()[1]) << 64)
}

type SwapInputs = Vec<(U160, U160, U160, I256, u128, i32)>;

/// Steps across a bucket of the MEDIUM resolution at boundaries spread over the price range, in
/// both directions and both modes.
fn generate_inputs() -> SwapInputs {
    let resolution = Resolution::MEDIUM.as_i32();
    let mut inputs = Vec::new();
    for i in 0u64..100 {
        let boundary_lower = ((pseudo_random(i).as_limbs()[0] % 160_000) as i32 - 80_000)
            / resolution
            * resolution;
        let (Ok(price_lower), Ok(price_upper)) = (
            get_price_x96_at_boundary(boundary_lower),
            get_price_x96_at_boundary(boundary_lower + resolution),
        ) else {
            continue;
        };
        let liquidity = pseudo_random_128(i.pow(2)) >> 8;
        let amount = I256::from_raw(U256::from(pseudo_random_128(i.pow(3)) >> 8));
        let amount = if i % 2 == 0 { -amount } else { amount };
        if i % 4 < 2 {
            inputs.push((price_upper, price_lower, MIN_RATIO, amount, liquidity, 500));
        } else {
            inputs.push((price_lower, price_upper, MAX_RATIO, amount, liquidity, 500));
        }
    }

    // Add edge cases
    inputs.extend([
        (
            U160::from(Q96),
            get_price_x96_at_boundary(1).unwrap_or(U160::from(Q96)),
            MAX_RATIO,
            I256::MINUS_ONE,
            1,
            100,
        ),
        (
            get_price_x96_at_boundary(30).unwrap_or(U160::from(Q96)),
            U160::from(Q96),
            MIN_RATIO,
            I256::from_raw(U256::from(u128::MAX)),
            u128::MAX,
            3000,
        ),
    ]);

    inputs
}

fn compute_swap_step_benchmark(c: &mut Criterion) {
    let inputs = generate_inputs();
    let mut group = c.benchmark_group("compute_swap_step");
    group.throughput(Throughput::Elements(inputs.len() as u64));

    group.bench_function("engine", |b| {
        b.iter(|| {
            for (
                price_current_x96,
                price_boundary_x96,
                price_limit_x96,
                amount_remaining,
                liquidity,
                fee_pips,
            ) in &inputs
            {
                let _ = black_box(compute_swap_step(
                    *price_current_x96,
                    *price_boundary_x96,
                    *price_limit_x96,
                    *amount_remaining,
                    *liquidity,
                    *fee_pips,
                ));
            }
        })
    });

    group.finish();
}

criterion_group!(benches, compute_swap_step_benchmark);
criterion_main!(benches);
