use crate::error::{Error, PoolError, StateError};
use crate::math::liquidity_math::add_delta;
use crate::math::math_helpers::{mul_div, mul_div_rounding_up, truncate_to_u128};
use crate::math::sqrt_price_math::{get_amount_0_delta, get_amount_1_delta};
use crate::math::tick_bitmap::{flip_tick, get_word};
use crate::math::tick_math::{MAX_TICK, MIN_TICK, get_sqrt_ratio_at_tick, get_tick_at_sqrt_ratio};
use crate::pool::events::PoolEvent;
use crate::pool::interfaces::{FlashCallback, MintCallback, TokenLedger};
use crate::pool::oracle::{Observation, Observations};
use crate::pool::position::{self, PositionInfo, PositionKey};
use crate::pool::tick::{self, TickInfo};
use crate::{FastMap, Q128, U256_1E6};
use alloy_primitives::{Address, I256, U256};
use tracing::debug;

/// Pool summary, rewritten atomically at the end of every swap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Slot0 {
    pub sqrt_price_x96: U256,
    pub tick: i32,
    pub observation_index: u16,
    pub observation_cardinality: u16,
    pub observation_cardinality_next: u16,
}

/// Parameters fixed at construction.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// The pool's own account on both token ledgers.
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    /// Swap fee in hundredths of a bip.
    pub fee: u32,
    pub tick_spacing: i32,
    pub max_liquidity_per_tick: u128,
}

/// Canonical `(token0, token1)` ordering.
pub fn sort_tokens(token0: Address, token1: Address) -> (Address, Address) {
    if token0 < token1 {
        (token0, token1)
    } else {
        (token1, token0)
    }
}

/// The concentrated-liquidity pool state machine.
///
/// The pool is single-threaded: each operation runs to completion, and
/// a failed operation leaves no visible state change. Asset balances
/// live on external [`TokenLedger`]s; the pool verifies its own balance
/// deltas after each callback.
#[derive(Clone, Debug)]
pub struct Pool {
    pub(crate) config: PoolConfig,
    pub(crate) slot0: Slot0,
    pub(crate) liquidity: u128,
    pub(crate) fee_growth_global_0_x128: U256,
    pub(crate) fee_growth_global_1_x128: U256,
    pub(crate) ticks: FastMap<i32, TickInfo>,
    pub(crate) bitmap: FastMap<i16, U256>,
    pub(crate) positions: FastMap<PositionKey, PositionInfo>,
    pub(crate) observations: Observations,
    pub(crate) block_timestamp: u32,
    pub(crate) unlocked: bool,
    pub(crate) events: Vec<PoolEvent>,
}

impl Pool {
    /// Builds an uninitialized pool. Every operation is rejected until
    /// [`initialize`](Self::initialize) sets the starting price.
    pub fn new(address: Address, token0: Address, token1: Address, fee: u32, tick_spacing: i32) -> Self {
        let (token0, token1) = sort_tokens(token0, token1);
        Self {
            config: PoolConfig {
                address,
                token0,
                token1,
                fee,
                tick_spacing,
                max_liquidity_per_tick: tick::max_liquidity_per_tick(tick_spacing),
            },
            slot0: Slot0::default(),
            liquidity: 0,
            fee_growth_global_0_x128: U256::ZERO,
            fee_growth_global_1_x128: U256::ZERO,
            ticks: FastMap::default(),
            bitmap: FastMap::default(),
            positions: FastMap::default(),
            observations: Observations::default(),
            block_timestamp: 0,
            unlocked: false,
            events: Vec::new(),
        }
    }

    /// Advances the pool clock. The embedding host is the time source;
    /// the oracle records at most one observation per distinct second.
    pub fn set_block_timestamp(&mut self, time: u32) {
        self.block_timestamp = time;
    }

    /// Sets the starting price, seeds the oracle and unlocks the pool.
    pub fn initialize(&mut self, sqrt_price_x96: U256) -> Result<(), Error> {
        if !self.slot0.sqrt_price_x96.is_zero() {
            return Err(PoolError::AlreadyInitialized.into());
        }
        let tick = get_tick_at_sqrt_ratio(sqrt_price_x96)?;
        let (cardinality, cardinality_next) = self.observations.initialize(self.block_timestamp);
        self.slot0 = Slot0 {
            sqrt_price_x96,
            tick,
            observation_index: 0,
            observation_cardinality: cardinality,
            observation_cardinality_next: cardinality_next,
        };
        self.unlocked = true;
        debug!(tick, "pool initialized");
        Ok(())
    }

    /// Runs a mutating operation on a staged copy, committing only on
    /// success. The lock is held across the whole operation, callback
    /// windows included.
    pub(crate) fn with_staged<T>(
        &mut self,
        f: impl FnOnce(&mut Pool) -> Result<T, Error>,
    ) -> Result<T, Error> {
        if !self.unlocked {
            return Err(PoolError::Locked.into());
        }
        self.unlocked = false;
        let mut staged = self.clone();
        let result = f(&mut staged);
        self.unlocked = true;
        if result.is_ok() {
            staged.unlocked = true;
            *self = staged;
        }
        result
    }

    fn check_ticks(&self, tick_lower: i32, tick_upper: i32) -> Result<(), Error> {
        if tick_lower >= tick_upper
            || tick_lower < MIN_TICK
            || tick_upper > MAX_TICK
            || tick_lower % self.config.tick_spacing != 0
            || tick_upper % self.config.tick_spacing != 0
        {
            return Err(PoolError::InvalidTickRange.into());
        }
        Ok(())
    }

    /// Applies a liquidity delta to a position, keeping the tick table,
    /// bitmap and in-range liquidity consistent. Returns the signed
    /// token amounts the delta is worth at the current price.
    pub(crate) fn modify_position(
        &mut self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        liquidity_delta: i128,
    ) -> Result<(I256, I256), Error> {
        self.check_ticks(tick_lower, tick_upper)?;
        let Slot0 {
            sqrt_price_x96,
            tick: tick_current,
            observation_index,
            observation_cardinality,
            ..
        } = self.slot0;

        let mut flipped_lower = false;
        let mut flipped_upper = false;

        if liquidity_delta != 0 {
            let tick_cumulative = self.observations.observe_single(
                self.block_timestamp,
                0,
                tick_current,
                observation_index,
                observation_cardinality,
            )?;

            flipped_lower = tick::update(
                &mut self.ticks,
                tick_lower,
                tick_current,
                liquidity_delta,
                self.fee_growth_global_0_x128,
                self.fee_growth_global_1_x128,
                tick_cumulative,
                self.config.max_liquidity_per_tick,
                false,
            )?;
            flipped_upper = tick::update(
                &mut self.ticks,
                tick_upper,
                tick_current,
                liquidity_delta,
                self.fee_growth_global_0_x128,
                self.fee_growth_global_1_x128,
                tick_cumulative,
                self.config.max_liquidity_per_tick,
                true,
            )?;

            if flipped_lower {
                flip_tick(&mut self.bitmap, tick_lower, self.config.tick_spacing)?;
            }
            if flipped_upper {
                flip_tick(&mut self.bitmap, tick_upper, self.config.tick_spacing)?;
            }
        }

        let (fee_growth_inside_0_x128, fee_growth_inside_1_x128) = tick::get_fee_growth_inside(
            &self.ticks,
            tick_lower,
            tick_upper,
            tick_current,
            self.fee_growth_global_0_x128,
            self.fee_growth_global_1_x128,
        );

        position::update(
            &mut self.positions,
            &PositionKey {
                owner,
                tick_lower,
                tick_upper,
            },
            liquidity_delta,
            fee_growth_inside_0_x128,
            fee_growth_inside_1_x128,
        )?;

        if liquidity_delta < 0 {
            if flipped_lower {
                tick::clear(&mut self.ticks, tick_lower);
            }
            if flipped_upper {
                tick::clear(&mut self.ticks, tick_upper);
            }
        }

        let mut amount0 = I256::ZERO;
        let mut amount1 = I256::ZERO;
        if liquidity_delta != 0 {
            if tick_current < tick_lower {
                // range entirely above the price: held in token0 only
                amount0 = get_amount_0_delta(
                    get_sqrt_ratio_at_tick(tick_lower)?,
                    get_sqrt_ratio_at_tick(tick_upper)?,
                    liquidity_delta,
                )?;
            } else if tick_current < tick_upper {
                amount0 = get_amount_0_delta(
                    sqrt_price_x96,
                    get_sqrt_ratio_at_tick(tick_upper)?,
                    liquidity_delta,
                )?;
                amount1 = get_amount_1_delta(
                    get_sqrt_ratio_at_tick(tick_lower)?,
                    sqrt_price_x96,
                    liquidity_delta,
                )?;
                self.liquidity = add_delta(self.liquidity, liquidity_delta)?;
            } else {
                // range entirely below the price: held in token1 only
                amount1 = get_amount_1_delta(
                    get_sqrt_ratio_at_tick(tick_lower)?,
                    get_sqrt_ratio_at_tick(tick_upper)?,
                    liquidity_delta,
                )?;
            }
        }

        Ok((amount0, amount1))
    }

    /// Adds `amount` liquidity to `owner`'s position over
    /// `[tick_lower, tick_upper)`. The callback must pay the returned
    /// amounts into the pool; both balances are verified afterwards.
    #[allow(clippy::too_many_arguments)]
    pub fn mint(
        &mut self,
        token0: &mut dyn TokenLedger,
        token1: &mut dyn TokenLedger,
        callback: &mut dyn MintCallback,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
        data: &[u8],
    ) -> Result<(U256, U256), Error> {
        self.with_staged(|pool| {
            pool.mint_locked(
                token0, token1, callback, owner, tick_lower, tick_upper, amount, data,
            )
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn mint_locked(
        &mut self,
        token0: &mut dyn TokenLedger,
        token1: &mut dyn TokenLedger,
        callback: &mut dyn MintCallback,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
        data: &[u8],
    ) -> Result<(U256, U256), Error> {
        if amount == 0 {
            return Err(PoolError::ZeroLiquidity.into());
        }
        let liquidity_delta =
            i128::try_from(amount).map_err(|_| crate::error::MathError::Overflow)?;

        let (amount0_int, amount1_int) =
            self.modify_position(owner, tick_lower, tick_upper, liquidity_delta)?;
        let amount0 = amount0_int.unsigned_abs();
        let amount1 = amount1_int.unsigned_abs();

        let pool_address = self.config.address;
        let balance0_before = if amount0.is_zero() {
            U256::ZERO
        } else {
            token0.balance_of(pool_address)
        };
        let balance1_before = if amount1.is_zero() {
            U256::ZERO
        } else {
            token1.balance_of(pool_address)
        };

        callback.mint_callback(&mut *token0, &mut *token1, amount0, amount1, data);

        if !amount0.is_zero() && token0.balance_of(pool_address) < balance0_before + amount0 {
            return Err(PoolError::InsufficientInputAmount.into());
        }
        if !amount1.is_zero() && token1.balance_of(pool_address) < balance1_before + amount1 {
            return Err(PoolError::InsufficientInputAmount.into());
        }

        debug!(%owner, tick_lower, tick_upper, amount, "minted liquidity");
        self.events.push(PoolEvent::Mint {
            owner,
            tick_lower,
            tick_upper,
            amount,
            amount0,
            amount1,
        });
        Ok((amount0, amount1))
    }

    /// Removes `amount` liquidity from `owner`'s position. The freed
    /// token amounts are credited to `tokens_owed` for a later
    /// [`collect`](Self::collect); nothing is transferred here. A zero
    /// amount is a fee poke on a live position.
    pub fn burn(
        &mut self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
    ) -> Result<(U256, U256), Error> {
        self.with_staged(|pool| pool.burn_locked(owner, tick_lower, tick_upper, amount))
    }

    fn burn_locked(
        &mut self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
    ) -> Result<(U256, U256), Error> {
        let liquidity_delta =
            i128::try_from(amount).map_err(|_| crate::error::MathError::Overflow)?;

        let (amount0_int, amount1_int) =
            self.modify_position(owner, tick_lower, tick_upper, -liquidity_delta)?;
        let amount0 = amount0_int.unsigned_abs();
        let amount1 = amount1_int.unsigned_abs();

        if !amount0.is_zero() || !amount1.is_zero() {
            let info = self
                .positions
                .get_mut(&PositionKey {
                    owner,
                    tick_lower,
                    tick_upper,
                })
                .ok_or(PoolError::PositionNotFound)?;
            info.tokens_owed_0 = info.tokens_owed_0.wrapping_add(truncate_to_u128(amount0));
            info.tokens_owed_1 = info.tokens_owed_1.wrapping_add(truncate_to_u128(amount1));
        }

        debug!(%owner, tick_lower, tick_upper, amount, "burned liquidity");
        self.events.push(PoolEvent::Burn {
            owner,
            tick_lower,
            tick_upper,
            amount,
            amount0,
            amount1,
        });
        Ok((amount0, amount1))
    }

    /// Pays out up to the requested share of `owner`'s accumulated
    /// `tokens_owed` to `recipient`.
    #[allow(clippy::too_many_arguments)]
    pub fn collect(
        &mut self,
        token0: &mut dyn TokenLedger,
        token1: &mut dyn TokenLedger,
        owner: Address,
        recipient: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount0_requested: u128,
        amount1_requested: u128,
    ) -> Result<(u128, u128), Error> {
        self.with_staged(|pool| {
            pool.collect_locked(
                token0,
                token1,
                owner,
                recipient,
                tick_lower,
                tick_upper,
                amount0_requested,
                amount1_requested,
            )
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn collect_locked(
        &mut self,
        token0: &mut dyn TokenLedger,
        token1: &mut dyn TokenLedger,
        owner: Address,
        recipient: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount0_requested: u128,
        amount1_requested: u128,
    ) -> Result<(u128, u128), Error> {
        let pool_address = self.config.address;
        let info = self
            .positions
            .get_mut(&PositionKey {
                owner,
                tick_lower,
                tick_upper,
            })
            .ok_or(PoolError::PositionNotFound)?;

        let amount0 = amount0_requested.min(info.tokens_owed_0);
        let amount1 = amount1_requested.min(info.tokens_owed_1);

        if amount0 > 0 {
            info.tokens_owed_0 -= amount0;
        }
        if amount1 > 0 {
            info.tokens_owed_1 -= amount1;
        }

        if amount0 > 0 && !token0.transfer(pool_address, recipient, U256::from(amount0)) {
            return Err(PoolError::TransferFailed.into());
        }
        if amount1 > 0 && !token1.transfer(pool_address, recipient, U256::from(amount1)) {
            return Err(PoolError::TransferFailed.into());
        }

        debug!(%owner, %recipient, tick_lower, tick_upper, "collected owed tokens");
        self.events.push(PoolEvent::Collect {
            owner,
            recipient,
            tick_lower,
            tick_upper,
            amount0,
            amount1,
        });
        Ok((amount0, amount1))
    }

    /// Lends out up to both whole reserves for the duration of the
    /// callback. Principals plus `ceil(amount * fee / 1e6)` must be back
    /// before the callback returns; whatever surplus comes back is
    /// credited to in-range liquidity.
    #[allow(clippy::too_many_arguments)]
    pub fn flash(
        &mut self,
        token0: &mut dyn TokenLedger,
        token1: &mut dyn TokenLedger,
        callback: &mut dyn FlashCallback,
        recipient: Address,
        amount0: U256,
        amount1: U256,
        data: &[u8],
    ) -> Result<(), Error> {
        self.with_staged(|pool| {
            pool.flash_locked(token0, token1, callback, recipient, amount0, amount1, data)
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn flash_locked(
        &mut self,
        token0: &mut dyn TokenLedger,
        token1: &mut dyn TokenLedger,
        callback: &mut dyn FlashCallback,
        recipient: Address,
        amount0: U256,
        amount1: U256,
        data: &[u8],
    ) -> Result<(), Error> {
        if self.liquidity == 0 {
            return Err(StateError::LiquidityIsZero.into());
        }
        let fee0 = mul_div_rounding_up(amount0, U256::from(self.config.fee), U256_1E6)?;
        let fee1 = mul_div_rounding_up(amount1, U256::from(self.config.fee), U256_1E6)?;

        let pool_address = self.config.address;
        let balance0_before = token0.balance_of(pool_address);
        let balance1_before = token1.balance_of(pool_address);

        if !amount0.is_zero() && !token0.transfer(pool_address, recipient, amount0) {
            return Err(PoolError::TransferFailed.into());
        }
        if !amount1.is_zero() && !token1.transfer(pool_address, recipient, amount1) {
            return Err(PoolError::TransferFailed.into());
        }

        callback.flash_callback(&mut *token0, &mut *token1, fee0, fee1, data);

        let balance0_after = token0.balance_of(pool_address);
        let balance1_after = token1.balance_of(pool_address);
        if balance0_after < balance0_before + fee0 || balance1_after < balance1_before + fee1 {
            return Err(PoolError::FlashLoanNotPaid.into());
        }

        let paid0 = balance0_after - balance0_before;
        let paid1 = balance1_after - balance1_before;
        let liquidity = U256::from(self.liquidity);
        if !paid0.is_zero() {
            self.fee_growth_global_0_x128 = self
                .fee_growth_global_0_x128
                .wrapping_add(mul_div(paid0, Q128, liquidity)?);
        }
        if !paid1.is_zero() {
            self.fee_growth_global_1_x128 = self
                .fee_growth_global_1_x128
                .wrapping_add(mul_div(paid1, Q128, liquidity)?);
        }

        debug!(%recipient, "flash repaid");
        self.events.push(PoolEvent::Flash {
            recipient,
            amount0,
            amount1,
            paid0,
            paid1,
        });
        Ok(())
    }

    /// Cumulative tick as of `seconds_ago` before the pool clock, one
    /// result per entry.
    pub fn observe(&self, seconds_agos: &[u32]) -> Result<Vec<i64>, Error> {
        if self.slot0.sqrt_price_x96.is_zero() {
            return Err(PoolError::Locked.into());
        }
        self.observations.observe(
            self.block_timestamp,
            seconds_agos,
            self.slot0.tick,
            self.slot0.observation_index,
            self.slot0.observation_cardinality,
        )
    }

    /// Raises the target cardinality of the observation ring. Payers
    /// call this to pre-allocate history depth; the live cardinality
    /// catches up as writes wrap.
    pub fn increase_observation_cardinality_next(&mut self, next: u16) -> Result<(), Error> {
        if !self.unlocked {
            return Err(PoolError::Locked.into());
        }
        let old = self.slot0.observation_cardinality_next;
        let new = self.observations.grow(old, next);
        self.slot0.observation_cardinality_next = new;
        if old != new {
            self.events.push(PoolEvent::IncreaseObservationCardinalityNext {
                observation_cardinality_next_old: old,
                observation_cardinality_next_new: new,
            });
        }
        Ok(())
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn slot0(&self) -> Slot0 {
        self.slot0
    }

    pub fn liquidity(&self) -> u128 {
        self.liquidity
    }

    pub fn fee_growth_global_0_x128(&self) -> U256 {
        self.fee_growth_global_0_x128
    }

    pub fn fee_growth_global_1_x128(&self) -> U256 {
        self.fee_growth_global_1_x128
    }

    pub fn ticks(&self, tick: i32) -> Option<&TickInfo> {
        self.ticks.get(&tick)
    }

    pub fn positions(
        &self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
    ) -> Option<&PositionInfo> {
        self.positions.get(&PositionKey {
            owner,
            tick_lower,
            tick_upper,
        })
    }

    pub fn tick_bitmap(&self, word: i16) -> U256 {
        get_word(&self.bitmap, word)
    }

    pub fn observations(&self, index: u16) -> Option<&Observation> {
        self.observations.get(index)
    }

    /// Drains the typed event log accumulated since the last drain.
    pub fn take_events(&mut self) -> Vec<PoolEvent> {
        std::mem::take(&mut self.events)
    }
}
