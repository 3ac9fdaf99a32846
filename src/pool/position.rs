use crate::FastMap;
use crate::Q128;
use crate::error::{Error, PoolError};
use crate::math::liquidity_math::add_delta;
use crate::math::math_helpers::{mul_div, truncate_to_u128};
use alloy_primitives::{Address, U256};

/// Positions are identified by the hash of their owner and range.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PositionKey {
    pub owner: Address,
    pub tick_lower: i32,
    pub tick_upper: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PositionInfo {
    pub liquidity: u128,
    pub fee_growth_inside_0_last_x128: U256,
    pub fee_growth_inside_1_last_x128: U256,
    pub tokens_owed_0: u128,
    pub tokens_owed_1: u128,
}

/// Settles fees accrued since the last touch and applies a liquidity
/// delta.
///
/// Fee settlement happens against the liquidity that earned it, before
/// the delta mutates it. A zero-delta poke of an empty position is
/// rejected; removing more than the held liquidity fails Underflow.
pub fn update(
    positions: &mut FastMap<PositionKey, PositionInfo>,
    key: &PositionKey,
    liquidity_delta: i128,
    fee_growth_inside_0_x128: U256,
    fee_growth_inside_1_x128: U256,
) -> Result<(), Error> {
    let info = positions.entry(key.clone()).or_default();

    if liquidity_delta == 0 && info.liquidity == 0 {
        return Err(PoolError::ZeroLiquidity.into());
    }

    let liquidity = U256::from(info.liquidity);
    let owed_0 = mul_div(
        fee_growth_inside_0_x128.wrapping_sub(info.fee_growth_inside_0_last_x128),
        liquidity,
        Q128,
    )?;
    let owed_1 = mul_div(
        fee_growth_inside_1_x128.wrapping_sub(info.fee_growth_inside_1_last_x128),
        liquidity,
        Q128,
    )?;

    // the owed accumulators wrap at 128 bits; owners collect before then
    info.tokens_owed_0 = info.tokens_owed_0.wrapping_add(truncate_to_u128(owed_0));
    info.tokens_owed_1 = info.tokens_owed_1.wrapping_add(truncate_to_u128(owed_1));

    info.liquidity = add_delta(info.liquidity, liquidity_delta)?;
    info.fee_growth_inside_0_last_x128 = fee_growth_inside_0_x128;
    info.fee_growth_inside_1_last_x128 = fee_growth_inside_1_x128;

    Ok(())
}
