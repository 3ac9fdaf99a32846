use crate::error::{Error, MathError};
use crate::math::math_helpers::{mul_div, mul_div_rounding_up};
use crate::math::sqrt_price_math::{
    get_amount_0_delta_base, get_amount_1_delta_base, get_next_sqrt_price_from_input,
};
use crate::{FEE_PIPS_DENOMINATOR, U256_1E6};
use alloy_primitives::U256;

/// Computes a single exact-input swap step between the current price and
/// a target price, returning
/// `(sqrt_price_next_x96, amount_in, amount_out, fee_amount)`.
///
/// The direction is implied by the price ordering. The fee is carved out
/// of the remaining input first; if the fee-reduced remainder covers the
/// full move to the target, the step lands exactly on the target and the
/// fee is `ceil(amount_in * fee / (1e6 - fee))`. Otherwise the step
/// consumes the whole remainder and the fee is whatever the realized
/// price move did not use.
///
/// With zero liquidity the step degenerates to the target with zero
/// amounts and zero fee; the caller's loop then walks past the empty
/// range.
pub fn compute_swap_step(
    sqrt_ratio_current_x96: U256,
    sqrt_ratio_target_x96: U256,
    liquidity: u128,
    amount_remaining: U256,
    fee_pips: u32,
) -> Result<(U256, U256, U256, U256), Error> {
    let zero_for_one = sqrt_ratio_current_x96 >= sqrt_ratio_target_x96;

    let amount_remaining_less_fee = mul_div(
        amount_remaining,
        U256::from(FEE_PIPS_DENOMINATOR - fee_pips),
        U256_1E6,
    )?;

    let amount_in_to_target = if zero_for_one {
        get_amount_0_delta_base(
            sqrt_ratio_target_x96,
            sqrt_ratio_current_x96,
            liquidity,
            true,
        )?
    } else {
        get_amount_1_delta_base(
            sqrt_ratio_current_x96,
            sqrt_ratio_target_x96,
            liquidity,
            true,
        )?
    };

    let (sqrt_ratio_next_x96, amount_in, fee_amount) =
        if amount_remaining_less_fee >= amount_in_to_target {
            let fee = mul_div_rounding_up(
                amount_in_to_target,
                U256::from(fee_pips),
                U256::from(FEE_PIPS_DENOMINATOR - fee_pips),
            )?;
            (sqrt_ratio_target_x96, amount_in_to_target, fee)
        } else {
            let next = get_next_sqrt_price_from_input(
                sqrt_ratio_current_x96,
                liquidity,
                amount_remaining_less_fee,
                zero_for_one,
            )?;
            // recompute the input for the realized move; the rounding
            // slack becomes part of the fee
            let amount_in = if zero_for_one {
                get_amount_0_delta_base(next, sqrt_ratio_current_x96, liquidity, true)?
            } else {
                get_amount_1_delta_base(sqrt_ratio_current_x96, next, liquidity, true)?
            };
            let fee = amount_remaining
                .checked_sub(amount_in)
                .ok_or(MathError::Underflow)?;
            (next, amount_in, fee)
        };

    let amount_out = if zero_for_one {
        get_amount_1_delta_base(sqrt_ratio_next_x96, sqrt_ratio_current_x96, liquidity, false)?
    } else {
        get_amount_0_delta_base(sqrt_ratio_current_x96, sqrt_ratio_next_x96, liquidity, false)?
    };

    Ok((sqrt_ratio_next_x96, amount_in, amount_out, fee_amount))
}
