use alloy_primitives::U256;

pub mod error;
mod hash;
pub mod math;
pub mod pool;

pub use hash::FastMap;
pub use pool::{Pool, PoolConfig, Slot0};

pub(crate) const U256_1: U256 = U256::from_limbs([1, 0, 0, 0]);
pub(crate) const U256_127: U256 = U256::from_limbs([127, 0, 0, 0]);
pub(crate) const U256_128: U256 = U256::from_limbs([128, 0, 0, 0]);

/// 2^160, the ceiling for Q64.96 sqrt prices.
pub(crate) const U160_MAX: U256 = U256::from_limbs([0, 0, 4294967296, 0]);

/// Fees are expressed in hundredths of a bip.
pub const FEE_PIPS_DENOMINATOR: u32 = 1_000_000;
pub(crate) const U256_1E6: U256 = U256::from_limbs([1_000_000, 0, 0, 0]);

pub const RESOLUTION: u8 = 96;
pub const Q96: U256 = U256::from_limbs([0, 4294967296, 0, 0]);
pub const Q128: U256 = U256::from_limbs([0, 0, 1, 0]);
