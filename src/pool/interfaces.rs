//! Seams to the pool's external collaborators. The pool never holds
//! asset balances itself; it reads its own balance on a ledger and
//! verifies deltas after each callback.

use alloy_primitives::{Address, I256, U256};

/// Minimal view of a fungible asset's balance book.
pub trait TokenLedger {
    fn balance_of(&self, account: Address) -> U256;

    /// Moves `amount` from `from` to `to`; returns false if the sender
    /// cannot cover it.
    fn transfer(&mut self, from: Address, to: Address, amount: U256) -> bool;
}

/// Invoked during [`mint`](crate::Pool::mint); must move the owed
/// amounts into the pool before returning. The pool checks its balances
/// afterwards and fails the mint on any shortfall.
pub trait MintCallback {
    fn mint_callback(
        &mut self,
        token0: &mut dyn TokenLedger,
        token1: &mut dyn TokenLedger,
        amount0_owed: U256,
        amount1_owed: U256,
        data: &[u8],
    );
}

/// Invoked during [`swap`](crate::Pool::swap) after the output side has
/// been paid out; the positive delta is owed by the caller.
pub trait SwapCallback {
    fn swap_callback(
        &mut self,
        token0: &mut dyn TokenLedger,
        token1: &mut dyn TokenLedger,
        amount0_delta: I256,
        amount1_delta: I256,
        data: &[u8],
    );
}

/// Invoked during [`flash`](crate::Pool::flash) once the principals have
/// been paid out; must return principals plus fees before returning.
pub trait FlashCallback {
    fn flash_callback(
        &mut self,
        token0: &mut dyn TokenLedger,
        token1: &mut dyn TokenLedger,
        fee0: U256,
        fee1: U256,
        data: &[u8],
    );
}
