use crate::FastMap;
use crate::error::{Error, MathError, PoolError};
use crate::math::liquidity_math::add_delta;
use crate::math::tick_math::{MAX_TICK, MIN_TICK};
use alloy_primitives::U256;

/// State held for every tick that currently bounds at least one
/// position. Entries are created on first touch and removed again when
/// `liquidity_gross` returns to zero.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickInfo {
    /// Reference count: sum of absolute endpoint contributions.
    pub liquidity_gross: u128,
    /// Net liquidity applied when the tick is crossed left to right.
    pub liquidity_net: i128,
    pub fee_growth_outside_0_x128: U256,
    pub fee_growth_outside_1_x128: U256,
    pub tick_cumulative_outside: i64,
    pub initialized: bool,
}

/// Largest `liquidity_gross` a single tick may carry, so that summing
/// every usable tick cannot overflow a u128.
pub fn max_liquidity_per_tick(tick_spacing: i32) -> u128 {
    let min_tick = (MIN_TICK / tick_spacing) * tick_spacing;
    let max_tick = (MAX_TICK / tick_spacing) * tick_spacing;
    let num_ticks = ((max_tick - min_tick) / tick_spacing) as u128 + 1;
    u128::MAX / num_ticks
}

/// Applies a liquidity delta to one endpoint of a range.
///
/// A tick initialized at or below the current tick inherits the running
/// globals as its "outside" snapshot; above, the snapshot stays zero.
/// Returns whether the tick flipped between initialized and empty.
#[allow(clippy::too_many_arguments)]
pub fn update(
    ticks: &mut FastMap<i32, TickInfo>,
    tick: i32,
    tick_current: i32,
    liquidity_delta: i128,
    fee_growth_global_0_x128: U256,
    fee_growth_global_1_x128: U256,
    tick_cumulative: i64,
    max_liquidity: u128,
    upper: bool,
) -> Result<bool, Error> {
    let info = ticks.entry(tick).or_default();

    let liquidity_gross_before = info.liquidity_gross;
    let liquidity_gross_after = add_delta(liquidity_gross_before, liquidity_delta)?;

    if liquidity_gross_after > max_liquidity {
        return Err(PoolError::TickLiquidityOverflow.into());
    }

    let flipped = (liquidity_gross_after == 0) != (liquidity_gross_before == 0);

    if liquidity_gross_before == 0 {
        if tick <= tick_current {
            info.fee_growth_outside_0_x128 = fee_growth_global_0_x128;
            info.fee_growth_outside_1_x128 = fee_growth_global_1_x128;
            info.tick_cumulative_outside = tick_cumulative;
        }
        info.initialized = true;
    }

    info.liquidity_gross = liquidity_gross_after;
    info.liquidity_net = if upper {
        info.liquidity_net.checked_sub(liquidity_delta)
    } else {
        info.liquidity_net.checked_add(liquidity_delta)
    }
    .ok_or(MathError::Overflow)?;

    Ok(flipped)
}

/// Crosses a tick during a swap: every "outside" accumulator flips to
/// `global - outside`. Returns the net liquidity to apply.
pub fn cross(
    ticks: &mut FastMap<i32, TickInfo>,
    tick: i32,
    fee_growth_global_0_x128: U256,
    fee_growth_global_1_x128: U256,
    tick_cumulative: i64,
) -> i128 {
    let info = ticks.entry(tick).or_default();
    info.fee_growth_outside_0_x128 =
        fee_growth_global_0_x128.wrapping_sub(info.fee_growth_outside_0_x128);
    info.fee_growth_outside_1_x128 =
        fee_growth_global_1_x128.wrapping_sub(info.fee_growth_outside_1_x128);
    info.tick_cumulative_outside = tick_cumulative.wrapping_sub(info.tick_cumulative_outside);
    info.liquidity_net
}

/// Drops a fully vacated tick; its snapshots must not survive.
pub fn clear(ticks: &mut FastMap<i32, TickInfo>, tick: i32) {
    ticks.remove(&tick);
}

/// Fee growth accumulated inside `[tick_lower, tick_upper)`, by cases on
/// where the current tick sits. All subtraction is modular by design.
pub fn get_fee_growth_inside(
    ticks: &FastMap<i32, TickInfo>,
    tick_lower: i32,
    tick_upper: i32,
    tick_current: i32,
    fee_growth_global_0_x128: U256,
    fee_growth_global_1_x128: U256,
) -> (U256, U256) {
    let lower = ticks.get(&tick_lower).cloned().unwrap_or_default();
    let upper = ticks.get(&tick_upper).cloned().unwrap_or_default();

    let (below_0, below_1) = if tick_current >= tick_lower {
        (
            lower.fee_growth_outside_0_x128,
            lower.fee_growth_outside_1_x128,
        )
    } else {
        (
            fee_growth_global_0_x128.wrapping_sub(lower.fee_growth_outside_0_x128),
            fee_growth_global_1_x128.wrapping_sub(lower.fee_growth_outside_1_x128),
        )
    };

    let (above_0, above_1) = if tick_current < tick_upper {
        (
            upper.fee_growth_outside_0_x128,
            upper.fee_growth_outside_1_x128,
        )
    } else {
        (
            fee_growth_global_0_x128.wrapping_sub(upper.fee_growth_outside_0_x128),
            fee_growth_global_1_x128.wrapping_sub(upper.fee_growth_outside_1_x128),
        )
    };

    (
        fee_growth_global_0_x128
            .wrapping_sub(below_0)
            .wrapping_sub(above_0),
        fee_growth_global_1_x128
            .wrapping_sub(below_1)
            .wrapping_sub(above_1),
    )
}
