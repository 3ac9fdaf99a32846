use crate::RESOLUTION;
use crate::math::math_helpers::{div_rounding_up, mul_div, mul_div_rounding_up, unlikely};
use crate::{
    Q96, U160_MAX,
    error::{Error, MathError, StateError},
};
use alloy_primitives::{I256, U256};

/// Next sqrt price after adding (or removing) `amount` of token0,
/// rounding the price up so the pool is never credited more than the
/// amount pays for.
pub fn get_next_sqrt_price_from_amount_0_rounding_up(
    sqrt_p_x96: U256,
    liquidity: u128,
    amount: U256,
    add: bool,
) -> Result<U256, Error> {
    if amount.is_zero() {
        return Ok(sqrt_p_x96);
    }

    let numerator1: U256 = U256::from(liquidity) << RESOLUTION;
    let product: U256 = amount.wrapping_mul(sqrt_p_x96);

    if add {
        if product.wrapping_div(amount) == sqrt_p_x96 {
            let denominator = numerator1.wrapping_add(product);
            if denominator >= numerator1 {
                return mul_div_rounding_up(numerator1, sqrt_p_x96, denominator)
                    .map_err(Error::from);
            }
        }
        // fallback path: liquidity / (liquidity / sqrtP + amount)
        Ok(div_rounding_up(
            numerator1,
            (numerator1 / sqrt_p_x96) + amount,
        ))
    } else {
        if product.wrapping_div(amount) != sqrt_p_x96 || numerator1 <= product {
            return Err(StateError::InsufficientReserves.into());
        }
        let denominator = numerator1 - product;
        mul_div_rounding_up(numerator1, sqrt_p_x96, denominator).map_err(Error::from)
    }
}

/// Next sqrt price after adding (or removing) `amount` of token1,
/// rounding the price down.
pub fn get_next_sqrt_price_from_amount_1_rounding_down(
    sqrt_p_x96: U256,
    liquidity: u128,
    amount: U256,
    add: bool,
) -> Result<U256, Error> {
    let liquidity = U256::from(liquidity);
    if add {
        let quotient: U256 = if amount <= U160_MAX {
            (amount << RESOLUTION) / liquidity
        } else {
            mul_div(amount, Q96, liquidity)?
        };

        let result = sqrt_p_x96 + quotient;
        if result <= U160_MAX {
            Ok(result)
        } else {
            Err(MathError::Overflow.into())
        }
    } else {
        let quotient: U256 = if amount <= U160_MAX {
            div_rounding_up(amount << RESOLUTION, liquidity)
        } else {
            mul_div_rounding_up(amount, Q96, liquidity)?
        };

        if sqrt_p_x96 <= quotient {
            return Err(StateError::InsufficientReserves.into());
        }
        let result = sqrt_p_x96 - quotient;

        if result <= U160_MAX {
            Ok(result)
        } else {
            Err(MathError::Overflow.into())
        }
    }
}

/// Token0 amount between two sqrt prices for a given liquidity:
/// `liquidity * 2^96 * (sqrtB - sqrtA) / (sqrtA * sqrtB)`.
///
/// `round_up` selects the pool-favoring direction: up for amounts the
/// user must pay in, down for amounts the pool pays out.
pub fn get_amount_0_delta_base(
    mut sqrt_ratio_a_x96: U256,
    mut sqrt_ratio_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<U256, Error> {
    if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
        (sqrt_ratio_a_x96, sqrt_ratio_b_x96) = (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
    };

    if sqrt_ratio_a_x96.is_zero() {
        return Err(StateError::SqrtRatioIsZero.into());
    }

    let numerator1 = U256::from(liquidity) << RESOLUTION;
    let numerator2 = sqrt_ratio_b_x96 - sqrt_ratio_a_x96;

    if round_up {
        Ok(div_rounding_up(
            mul_div_rounding_up(numerator1, numerator2, sqrt_ratio_b_x96)?,
            sqrt_ratio_a_x96,
        ))
    } else {
        Ok(mul_div(numerator1, numerator2, sqrt_ratio_b_x96)? / sqrt_ratio_a_x96)
    }
}

/// Token1 amount between two sqrt prices for a given liquidity:
/// `liquidity * (sqrtB - sqrtA) / 2^96`.
pub fn get_amount_1_delta_base(
    mut sqrt_ratio_a_x96: U256,
    mut sqrt_ratio_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<U256, MathError> {
    if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
        (sqrt_ratio_a_x96, sqrt_ratio_b_x96) = (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
    };
    let liquidity = U256::from(liquidity);

    if round_up {
        mul_div_rounding_up(liquidity, sqrt_ratio_b_x96 - sqrt_ratio_a_x96, Q96)
    } else {
        mul_div(liquidity, sqrt_ratio_b_x96 - sqrt_ratio_a_x96, Q96)
    }
}

/// Signed token0 delta for a signed liquidity change. Negative
/// liquidity (removal) rounds toward zero, positive rounds up.
pub fn get_amount_0_delta(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: i128,
) -> Result<I256, Error> {
    if liquidity < 0 {
        Ok(-I256::from_raw(get_amount_0_delta_base(
            sqrt_ratio_a_x96,
            sqrt_ratio_b_x96,
            liquidity.unsigned_abs(),
            false,
        )?))
    } else {
        Ok(I256::from_raw(get_amount_0_delta_base(
            sqrt_ratio_a_x96,
            sqrt_ratio_b_x96,
            liquidity as u128,
            true,
        )?))
    }
}

/// Signed token1 delta for a signed liquidity change.
pub fn get_amount_1_delta(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: i128,
) -> Result<I256, MathError> {
    if liquidity < 0 {
        Ok(-I256::from_raw(get_amount_1_delta_base(
            sqrt_ratio_a_x96,
            sqrt_ratio_b_x96,
            liquidity.unsigned_abs(),
            false,
        )?))
    } else {
        Ok(I256::from_raw(get_amount_1_delta_base(
            sqrt_ratio_a_x96,
            sqrt_ratio_b_x96,
            liquidity as u128,
            true,
        )?))
    }
}

/// Next sqrt price after swapping `amount_in` into the pool, choosing
/// the token0/token1 branch from the swap direction.
pub fn get_next_sqrt_price_from_input(
    sqrt_p_x96: U256,
    liquidity: u128,
    amount_in: U256,
    zero_for_one: bool,
) -> Result<U256, Error> {
    if unlikely(sqrt_p_x96.is_zero()) {
        return Err(StateError::SqrtPriceIsZero.into());
    }
    if unlikely(liquidity == 0) {
        return Err(StateError::LiquidityIsZero.into());
    }

    if zero_for_one {
        get_next_sqrt_price_from_amount_0_rounding_up(sqrt_p_x96, liquidity, amount_in, true)
    } else {
        get_next_sqrt_price_from_amount_1_rounding_down(sqrt_p_x96, liquidity, amount_in, true)
    }
}

/// Next sqrt price after swapping `amount_out` out of the pool.
pub fn get_next_sqrt_price_from_output(
    sqrt_p_x96: U256,
    liquidity: u128,
    amount_out: U256,
    zero_for_one: bool,
) -> Result<U256, Error> {
    if unlikely(sqrt_p_x96.is_zero()) {
        return Err(StateError::SqrtPriceIsZero.into());
    }
    if unlikely(liquidity == 0) {
        return Err(StateError::LiquidityIsZero.into());
    }

    if zero_for_one {
        get_next_sqrt_price_from_amount_1_rounding_down(sqrt_p_x96, liquidity, amount_out, false)
    } else {
        get_next_sqrt_price_from_amount_0_rounding_up(sqrt_p_x96, liquidity, amount_out, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::U256_1;
    const U256_2: U256 = U256::from_limbs([2, 0, 0, 0]);
    use std::{
        ops::{Add, Sub},
        str::FromStr,
    };

    #[test]
    fn next_sqrt_price_from_input_rejects_degenerate_state() {
        // zero price
        let result = get_next_sqrt_price_from_input(
            U256::ZERO,
            0,
            U256::from(100000000000000000_u128),
            false,
        );
        assert!(matches!(
            result,
            Err(Error::StateError(StateError::SqrtPriceIsZero))
        ));

        // zero liquidity
        let result =
            get_next_sqrt_price_from_input(U256_1, 0, U256::from(100000000000000000_u128), true);
        assert!(matches!(
            result,
            Err(Error::StateError(StateError::LiquidityIsZero))
        ));

        // input amount overflows the price
        let result = get_next_sqrt_price_from_input(U160_MAX, 1024, U256::from(1024), false);
        assert!(matches!(result, Err(Error::MathError(MathError::Overflow))));
    }

    #[test]
    fn next_sqrt_price_from_input_cannot_underflow() {
        let result = get_next_sqrt_price_from_input(
            U256_1,
            1,
            U256::from_str(
                "57896044618658097711785492504343953926634992332820282019728792003956564819968",
            )
            .unwrap(),
            true,
        );
        assert_eq!(result.unwrap(), U256_1);
    }

    #[test]
    fn next_sqrt_price_from_input_zero_amount_is_identity() {
        for zero_for_one in [true, false] {
            let result = get_next_sqrt_price_from_input(
                U256::from_str("79228162514264337593543950336").unwrap(),
                1e17 as u128,
                U256::ZERO,
                zero_for_one,
            );
            assert_eq!(
                result.unwrap(),
                U256::from_str("79228162514264337593543950336").unwrap()
            );
        }
    }

    #[test]
    fn next_sqrt_price_from_input_extremes() {
        // minimum price for maximum inputs
        let sqrt_price = U160_MAX;
        let liquidity = u128::MAX;
        let max_amount_no_overflow = U256::MAX - ((U256::from(liquidity) << 96) / sqrt_price);
        let result =
            get_next_sqrt_price_from_input(sqrt_price, liquidity, max_amount_no_overflow, true);
        assert_eq!(result.unwrap(), U256_1);

        // can return 1 with enough amount in
        let result = get_next_sqrt_price_from_input(
            U256::from_str("79228162514264337593543950336").unwrap(),
            1,
            U256::MAX / U256_2,
            true,
        );
        assert_eq!(result.unwrap(), U256_1);
    }

    #[test]
    fn next_sqrt_price_from_input_reference_values() {
        // 0.1 token1 in
        let result = get_next_sqrt_price_from_input(
            U256::from_str("79228162514264337593543950336").unwrap(),
            1e18 as u128,
            U256::from_str("100000000000000000").unwrap(),
            false,
        );
        assert_eq!(
            result.unwrap(),
            U256::from_str("87150978765690771352898345369").unwrap()
        );

        // 0.1 token0 in
        let result = get_next_sqrt_price_from_input(
            U256::from_str("79228162514264337593543950336").unwrap(),
            1e18 as u128,
            U256::from_str("100000000000000000").unwrap(),
            true,
        );
        assert_eq!(
            result.unwrap(),
            U256::from_str("72025602285694852357767227579").unwrap()
        );

        // amount in above 2^96
        let result = get_next_sqrt_price_from_input(
            U256::from_str("79228162514264337593543950336").unwrap(),
            1e19 as u128,
            U256::from_str("1267650600228229401496703205376").unwrap(),
            true,
        );
        assert_eq!(
            result.unwrap(),
            U256::from_str("624999999995069620").unwrap()
        );
    }

    #[test]
    fn next_sqrt_price_from_output_rejects_degenerate_state() {
        let result = get_next_sqrt_price_from_output(U256::ZERO, 0, U256::from(1000000000), false);
        assert!(matches!(
            result,
            Err(Error::StateError(StateError::SqrtPriceIsZero))
        ));

        let result = get_next_sqrt_price_from_output(U256_1, 0, U256::from(1000000000), false);
        assert!(matches!(
            result,
            Err(Error::StateError(StateError::LiquidityIsZero))
        ));
    }

    #[test]
    fn next_sqrt_price_from_output_respects_virtual_reserves() {
        let price = U256::from_str("20282409603651670423947251286016").unwrap();

        // output equal to or above the virtual token0 reserves
        for amount in [4u64, 5u64] {
            let result = get_next_sqrt_price_from_output(price, 1024, U256::from(amount), false);
            assert!(matches!(
                result,
                Err(Error::StateError(StateError::InsufficientReserves))
            ));
        }

        // output equal to or above the virtual token1 reserves
        for amount in [262144u64, 262145u64] {
            let result = get_next_sqrt_price_from_output(price, 1024, U256::from(amount), true);
            assert!(matches!(
                result,
                Err(Error::StateError(StateError::InsufficientReserves))
            ));
        }

        // just below the virtual token1 reserves succeeds
        let result = get_next_sqrt_price_from_output(price, 1024, U256::from(262143), true);
        assert_eq!(
            result.unwrap(),
            U256::from_str("77371252455336267181195264").unwrap()
        );
    }

    #[test]
    fn next_sqrt_price_from_output_reference_values() {
        let result = get_next_sqrt_price_from_output(
            U256::from_str("79228162514264337593543950336").unwrap(),
            1e18 as u128,
            U256::from(1e17 as u128),
            false,
        );
        assert_eq!(
            result.unwrap(),
            U256::from_str("88031291682515930659493278152").unwrap()
        );

        let result = get_next_sqrt_price_from_output(
            U256::from_str("79228162514264337593543950336").unwrap(),
            1e18 as u128,
            U256::from(1e17 as u128),
            true,
        );
        assert_eq!(
            result.unwrap(),
            U256::from_str("71305346262837903834189555302").unwrap()
        );

        // impossible outputs
        let result = get_next_sqrt_price_from_output(
            U256::from_str("79228162514264337593543950336").unwrap(),
            1,
            U256::MAX,
            true,
        );
        assert!(matches!(result, Err(Error::MathError(MathError::Overflow))));

        let result = get_next_sqrt_price_from_output(
            U256::from_str("79228162514264337593543950336").unwrap(),
            1,
            U256::MAX,
            false,
        );
        assert!(matches!(
            result,
            Err(Error::StateError(StateError::InsufficientReserves))
        ));
    }

    #[test]
    fn amount_0_delta_reference_values() {
        // zero liquidity, zero result
        let amount_0 = get_amount_0_delta_base(
            U256::from_str("79228162514264337593543950336").unwrap(),
            U256::from_str("79228162514264337593543950336").unwrap(),
            0,
            true,
        );
        assert_eq!(amount_0.unwrap(), U256::ZERO);

        // price 1 -> 1.21
        let amount_0 = get_amount_0_delta_base(
            U256::from_str("79228162514264337593543950336").unwrap(),
            U256::from_str("87150978765690771352898345369").unwrap(),
            1e18 as u128,
            true,
        )
        .unwrap();
        assert_eq!(amount_0, U256::from_str("90909090909090910").unwrap());

        let amount_0_rounded_down = get_amount_0_delta_base(
            U256::from_str("79228162514264337593543950336").unwrap(),
            U256::from_str("87150978765690771352898345369").unwrap(),
            1e18 as u128,
            false,
        );
        assert_eq!(amount_0_rounded_down.unwrap(), amount_0.sub(U256_1));

        // prices whose product overflows 256 bits
        let amount_0_up = get_amount_0_delta_base(
            U256::from_str("2787593149816327892691964784081045188247552").unwrap(),
            U256::from_str("22300745198530623141535718272648361505980416").unwrap(),
            1e18 as u128,
            true,
        )
        .unwrap();
        let amount_0_down = get_amount_0_delta_base(
            U256::from_str("2787593149816327892691964784081045188247552").unwrap(),
            U256::from_str("22300745198530623141535718272648361505980416").unwrap(),
            1e18 as u128,
            false,
        )
        .unwrap();
        assert_eq!(amount_0_up, amount_0_down.add(U256_1));
    }

    #[test]
    fn amount_1_delta_reference_values() {
        let amount_1 = get_amount_1_delta_base(
            U256::from_str("79228162514264337593543950336").unwrap(),
            U256::from_str("87150978765690771352898345369").unwrap(),
            1e18 as u128,
            true,
        )
        .unwrap();
        assert_eq!(amount_1, U256::from_str("100000000000000000").unwrap());

        let amount_1_rounded_down = get_amount_1_delta_base(
            U256::from_str("79228162514264337593543950336").unwrap(),
            U256::from_str("87150978765690771352898345369").unwrap(),
            1e18 as u128,
            false,
        );
        assert_eq!(amount_1_rounded_down.unwrap(), amount_1.sub(U256_1));
    }

    #[test]
    fn signed_deltas_round_toward_zero_on_removal() {
        let a = U256::from_str("79228162514264337593543950336").unwrap();
        let b = U256::from_str("87150978765690771352898345369").unwrap();

        let added = get_amount_0_delta(a, b, 1e18 as i128).unwrap();
        let removed = get_amount_0_delta(a, b, -(1e18 as i128)).unwrap();
        assert_eq!(added + removed, I256::ONE);

        let added = get_amount_1_delta(a, b, 1e18 as i128).unwrap();
        let removed = get_amount_1_delta(a, b, -(1e18 as i128)).unwrap();
        assert_eq!(added + removed, I256::ONE);
    }

    #[test]
    fn swap_step_round_trip() {
        let sqrt_price =
            U256::from_str("1025574284609383690408304870162715216695788925244").unwrap();
        let liquidity = 50015962439936049619261659728067971248;
        let amount_in = U256::from(406);

        let sqrt_q =
            get_next_sqrt_price_from_input(sqrt_price, liquidity, amount_in, true).unwrap();
        assert_eq!(
            sqrt_q,
            U256::from_str("1025574284609383582644711336373707553698163132913").unwrap()
        );

        let amount_0_delta = get_amount_0_delta_base(sqrt_q, sqrt_price, liquidity, true).unwrap();
        assert_eq!(amount_0_delta, U256::from(406));
    }
}
