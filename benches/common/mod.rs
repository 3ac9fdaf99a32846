use alloy_primitives::U256;
use clmm_pool::FastMap;
use clmm_pool::math::bit_math::{least_significant_bit, most_significant_bit};
use clmm_pool::math::math_helpers::{mul_div, mul_div_rounding_up};
use clmm_pool::math::sqrt_price_math::{
    get_amount_0_delta_base, get_next_sqrt_price_from_input,
};
use clmm_pool::math::swap_math::compute_swap_step;
use clmm_pool::math::tick_bitmap::{flip_tick, next_initialized_tick_within_one_word};
use clmm_pool::math::tick_math::{get_sqrt_ratio_at_tick, get_tick_at_sqrt_ratio};
use criterion::{Criterion, black_box};
use std::str::FromStr;

fn price_one() -> U256 {
    U256::from_str("79228162514264337593543950336").unwrap()
}

pub fn bench_tick_math(c: &mut Criterion) {
    c.bench_function("get_sqrt_ratio_at_tick", |b| {
        b.iter(|| get_sqrt_ratio_at_tick(black_box(123_456)).unwrap())
    });
    let ratio = get_sqrt_ratio_at_tick(123_456).unwrap();
    c.bench_function("get_tick_at_sqrt_ratio", |b| {
        b.iter(|| get_tick_at_sqrt_ratio(black_box(ratio)).unwrap())
    });
}

pub fn bench_sqrt_price_math(c: &mut Criterion) {
    let price = price_one();
    let amount = U256::from(1e15 as u64);
    c.bench_function("get_next_sqrt_price_from_input", |b| {
        b.iter(|| {
            get_next_sqrt_price_from_input(
                black_box(price),
                black_box(1e18 as u128),
                black_box(amount),
                true,
            )
            .unwrap()
        })
    });
    let lower = get_sqrt_ratio_at_tick(-600).unwrap();
    c.bench_function("get_amount_0_delta", |b| {
        b.iter(|| {
            get_amount_0_delta_base(black_box(lower), black_box(price), 1e18 as u128, true).unwrap()
        })
    });
}

pub fn bench_swap_math(c: &mut Criterion) {
    let price = price_one();
    let target = get_sqrt_ratio_at_tick(-600).unwrap();
    c.bench_function("compute_swap_step", |b| {
        b.iter(|| {
            compute_swap_step(
                black_box(price),
                black_box(target),
                1e18 as u128,
                U256::from(1e15 as u64),
                3000,
            )
            .unwrap()
        })
    });
}

pub fn bench_math_helpers(c: &mut Criterion) {
    let a = U256::from_str("340282366920938463463374607431768211456").unwrap();
    let b_ = U256::from_str("79228162514264337593543950336").unwrap();
    let denom = U256::from(1e18 as u128);
    c.bench_function("mul_div", |b| {
        b.iter(|| mul_div(black_box(a), black_box(b_), black_box(denom)).unwrap())
    });
    c.bench_function("mul_div_rounding_up", |b| {
        b.iter(|| mul_div_rounding_up(black_box(a), black_box(b_), black_box(denom)).unwrap())
    });
}

pub fn bench_tick_bitmap(c: &mut Criterion) {
    let mut bitmap: FastMap<i16, U256> = FastMap::default();
    for tick in (-600..=600).step_by(120) {
        flip_tick(&mut bitmap, tick, 60).unwrap();
    }
    c.bench_function("next_initialized_tick_within_one_word", |b| {
        b.iter(|| {
            next_initialized_tick_within_one_word(black_box(&bitmap), black_box(7), 60, true)
                .unwrap()
        })
    });
}

pub fn bench_bit_math(c: &mut Criterion) {
    let x = U256::from_str("39614081257132168796771975168").unwrap();
    c.bench_function("most_significant_bit", |b| {
        b.iter(|| most_significant_bit(black_box(x)).unwrap())
    });
    c.bench_function("least_significant_bit", |b| {
        b.iter(|| least_significant_bit(black_box(x)).unwrap())
    });
}
