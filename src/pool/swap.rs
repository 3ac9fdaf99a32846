use crate::Q128;
use crate::error::{Error, MathError, PoolError, SwapError};
use crate::math::liquidity_math::add_delta;
use crate::math::math_helpers::mul_div;
use crate::math::swap_math::compute_swap_step;
use crate::math::tick_bitmap::next_initialized_tick_within_one_word;
use crate::math::tick_math::{
    MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO, MIN_TICK, get_sqrt_ratio_at_tick,
    get_tick_at_sqrt_ratio,
};
use crate::pool::core::Pool;
use crate::pool::events::PoolEvent;
use crate::pool::interfaces::{SwapCallback, TokenLedger};
use crate::pool::tick;
use alloy_primitives::{Address, I256, U256};
use tracing::{debug, trace};

// the top level state of the swap, the results of which are recorded in
// storage at the end
struct SwapState {
    // the amount remaining to be swapped in of the input asset
    amount_specified_remaining: U256,
    // the amount already swapped out of the output asset
    amount_calculated: U256,
    // current sqrt(price)
    sqrt_price_x96: U256,
    // the tick associated with the current price
    tick: i32,
    // the input side's running fee growth, stored back at the end
    fee_growth_global_x128: U256,
    // the current liquidity in range
    liquidity: u128,
}

#[derive(Default)]
struct StepComputations {
    // the price at the beginning of the step
    sqrt_price_start_x96: U256,
    // the next tick to swap to from the current tick in the swap direction
    tick_next: i32,
    // whether tick_next is initialized or not
    initialized: bool,
    // sqrt(price) for the next tick (1/0)
    sqrt_price_next_x96: U256,
    // how much is being swapped in in this step
    amount_in: U256,
    // how much is being swapped out
    amount_out: U256,
    // how much fee is being paid in
    fee_amount: U256,
}

impl Pool {
    /// Swaps an exact `amount_in` of one token for the other, walking
    /// tick by tick until the input is exhausted or the price limit is
    /// hit. Returns the signed per-side deltas: positive is owed by the
    /// caller, negative by the pool.
    ///
    /// The output side is paid to `recipient` before the callback runs;
    /// the callback must then pay the input side, which is verified by
    /// balance delta.
    #[allow(clippy::too_many_arguments)]
    pub fn swap(
        &mut self,
        token0: &mut dyn TokenLedger,
        token1: &mut dyn TokenLedger,
        callback: &mut dyn SwapCallback,
        recipient: Address,
        zero_for_one: bool,
        amount_in: U256,
        sqrt_price_limit_x96: U256,
        data: &[u8],
    ) -> Result<(I256, I256), Error> {
        self.with_staged(|pool| {
            pool.swap_locked(
                token0,
                token1,
                callback,
                recipient,
                zero_for_one,
                amount_in,
                sqrt_price_limit_x96,
                data,
            )
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn swap_locked(
        &mut self,
        token0: &mut dyn TokenLedger,
        token1: &mut dyn TokenLedger,
        callback: &mut dyn SwapCallback,
        recipient: Address,
        zero_for_one: bool,
        amount_in: U256,
        sqrt_price_limit_x96: U256,
        data: &[u8],
    ) -> Result<(I256, I256), Error> {
        if amount_in.is_zero() {
            return Err(SwapError::AmountSpecifiedIsZero.into());
        }

        let slot0_start = self.slot0;
        if zero_for_one {
            if sqrt_price_limit_x96 >= slot0_start.sqrt_price_x96
                || sqrt_price_limit_x96 <= MIN_SQRT_RATIO
            {
                return Err(SwapError::InvalidPriceLimit.into());
            }
        } else if sqrt_price_limit_x96 <= slot0_start.sqrt_price_x96
            || sqrt_price_limit_x96 >= MAX_SQRT_RATIO
        {
            return Err(SwapError::InvalidPriceLimit.into());
        }

        let mut state = SwapState {
            amount_specified_remaining: amount_in,
            amount_calculated: U256::ZERO,
            sqrt_price_x96: slot0_start.sqrt_price_x96,
            tick: slot0_start.tick,
            fee_growth_global_x128: if zero_for_one {
                self.fee_growth_global_0_x128
            } else {
                self.fee_growth_global_1_x128
            },
            liquidity: self.liquidity,
        };

        // running cumulative tick, fetched once on the first cross
        let mut tick_cumulative: Option<i64> = None;

        while !state.amount_specified_remaining.is_zero()
            && state.sqrt_price_x96 != sqrt_price_limit_x96
        {
            let mut step = StepComputations {
                sqrt_price_start_x96: state.sqrt_price_x96,
                ..StepComputations::default()
            };

            (step.tick_next, step.initialized) = next_initialized_tick_within_one_word(
                &self.bitmap,
                state.tick,
                self.config.tick_spacing,
                zero_for_one,
            )?;

            step.tick_next = step.tick_next.clamp(MIN_TICK, MAX_TICK);

            step.sqrt_price_next_x96 = get_sqrt_ratio_at_tick(step.tick_next)?;

            // never step past the price limit
            let sqrt_price_target_x96 = if zero_for_one {
                if step.sqrt_price_next_x96 < sqrt_price_limit_x96 {
                    sqrt_price_limit_x96
                } else {
                    step.sqrt_price_next_x96
                }
            } else if step.sqrt_price_next_x96 > sqrt_price_limit_x96 {
                sqrt_price_limit_x96
            } else {
                step.sqrt_price_next_x96
            };

            (
                state.sqrt_price_x96,
                step.amount_in,
                step.amount_out,
                step.fee_amount,
            ) = compute_swap_step(
                state.sqrt_price_x96,
                sqrt_price_target_x96,
                state.liquidity,
                state.amount_specified_remaining,
                self.config.fee,
            )?;

            state.amount_specified_remaining = state
                .amount_specified_remaining
                .checked_sub(step.amount_in + step.fee_amount)
                .ok_or(MathError::Underflow)?;
            state.amount_calculated = state
                .amount_calculated
                .checked_add(step.amount_out)
                .ok_or(MathError::Overflow)?;

            if state.liquidity > 0 {
                state.fee_growth_global_x128 = state.fee_growth_global_x128.wrapping_add(mul_div(
                    step.fee_amount,
                    Q128,
                    U256::from(state.liquidity),
                )?);
            }

            if state.sqrt_price_x96 == step.sqrt_price_next_x96 {
                // the step ended on a tick boundary
                if step.initialized {
                    let cumulative = match tick_cumulative {
                        Some(cumulative) => cumulative,
                        None => {
                            let cumulative = self.observations.observe_single(
                                self.block_timestamp,
                                0,
                                slot0_start.tick,
                                slot0_start.observation_index,
                                slot0_start.observation_cardinality,
                            )?;
                            tick_cumulative = Some(cumulative);
                            cumulative
                        }
                    };

                    // the input side sees the running global, the output
                    // side the stored one
                    let (fee_growth_0, fee_growth_1) = if zero_for_one {
                        (state.fee_growth_global_x128, self.fee_growth_global_1_x128)
                    } else {
                        (self.fee_growth_global_0_x128, state.fee_growth_global_x128)
                    };

                    let mut liquidity_net = tick::cross(
                        &mut self.ticks,
                        step.tick_next,
                        fee_growth_0,
                        fee_growth_1,
                        cumulative,
                    );
                    // leaving the range leftward applies the negated net
                    if zero_for_one {
                        liquidity_net = -liquidity_net;
                    }
                    state.liquidity =
                        add_delta(state.liquidity, liquidity_net).map_err(|e| match e {
                            MathError::Underflow => Error::from(SwapError::NotEnoughLiquidity),
                            other => Error::from(other),
                        })?;
                }

                // ticks are half-open to the left
                state.tick = if zero_for_one {
                    step.tick_next - 1
                } else {
                    step.tick_next
                };
            } else if state.sqrt_price_x96 != step.sqrt_price_start_x96 {
                state.tick = get_tick_at_sqrt_ratio(state.sqrt_price_x96)?;
            }

            trace!(
                tick = state.tick,
                amount_in = %step.amount_in,
                amount_out = %step.amount_out,
                fee = %step.fee_amount,
                "swap step"
            );
        }

        if state.tick != slot0_start.tick {
            // record the pre-swap tick: the first trade of each second
            // fixes the oracle sample
            let (observation_index, observation_cardinality) = self.observations.write(
                slot0_start.observation_index,
                self.block_timestamp,
                slot0_start.tick,
                slot0_start.observation_cardinality,
                slot0_start.observation_cardinality_next,
            );
            self.slot0.sqrt_price_x96 = state.sqrt_price_x96;
            self.slot0.tick = state.tick;
            self.slot0.observation_index = observation_index;
            self.slot0.observation_cardinality = observation_cardinality;
        } else {
            self.slot0.sqrt_price_x96 = state.sqrt_price_x96;
        }

        if self.liquidity != state.liquidity {
            self.liquidity = state.liquidity;
        }

        if zero_for_one {
            self.fee_growth_global_0_x128 = state.fee_growth_global_x128;
        } else {
            self.fee_growth_global_1_x128 = state.fee_growth_global_x128;
        }

        let amount_in_used = amount_in - state.amount_specified_remaining;
        let (amount0, amount1) = if zero_for_one {
            (
                I256::from_raw(amount_in_used),
                -I256::from_raw(state.amount_calculated),
            )
        } else {
            (
                -I256::from_raw(state.amount_calculated),
                I256::from_raw(amount_in_used),
            )
        };

        // settle: pay the output out, then verify the input came in
        let pool_address = self.config.address;
        if zero_for_one {
            if amount1 < I256::ZERO
                && !token1.transfer(pool_address, recipient, amount1.unsigned_abs())
            {
                return Err(PoolError::TransferFailed.into());
            }
            let balance0_before = token0.balance_of(pool_address);
            callback.swap_callback(&mut *token0, &mut *token1, amount0, amount1, data);
            if token0.balance_of(pool_address) < balance0_before + amount0.unsigned_abs() {
                return Err(PoolError::InsufficientInputAmount.into());
            }
        } else {
            if amount0 < I256::ZERO
                && !token0.transfer(pool_address, recipient, amount0.unsigned_abs())
            {
                return Err(PoolError::TransferFailed.into());
            }
            let balance1_before = token1.balance_of(pool_address);
            callback.swap_callback(&mut *token0, &mut *token1, amount0, amount1, data);
            if token1.balance_of(pool_address) < balance1_before + amount1.unsigned_abs() {
                return Err(PoolError::InsufficientInputAmount.into());
            }
        }

        debug!(
            zero_for_one,
            amount0 = %amount0,
            amount1 = %amount1,
            tick = state.tick,
            "swap settled"
        );
        self.events.push(PoolEvent::Swap {
            recipient,
            amount0,
            amount1,
            sqrt_price_x96: state.sqrt_price_x96,
            liquidity: state.liquidity,
            tick: state.tick,
        });
        Ok((amount0, amount1))
    }
}
