use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MathError {
    #[error("Math error - overflow")]
    Overflow,
    #[error("Math error - underflow")]
    Underflow,
    #[error("Math error - out of bounds")]
    OutOfBounds,
    #[error("Math error - division by zero")]
    DivisionByZero,
    #[error("BitMath error - zero input value")]
    ZeroValue,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("State error - sqrtPrice out of bounds")]
    SqrtPriceOutOfBounds,
    #[error("State error - sqrtPrice is 0")]
    SqrtPriceIsZero,
    #[error("State error - sqrtRatio is 0")]
    SqrtRatioIsZero,

    #[error("State error - tick out of bounds")]
    TickOutOfBounds,

    #[error("State error - liquidity is 0")]
    LiquidityIsZero,

    #[error("State error - requested amount exceeds pool reserves")]
    InsufficientReserves,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SwapError {
    #[error("Swap error - amount specified is 0")]
    AmountSpecifiedIsZero,
    #[error("Swap error - price limit on the wrong side of the current price")]
    InvalidPriceLimit,
    #[error("Swap error - crossing would leave no liquidity in range")]
    NotEnoughLiquidity,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("Pool error - tick range is inverted, out of bounds or misaligned")]
    InvalidTickRange,
    #[error("Pool error - zero liquidity")]
    ZeroLiquidity,
    #[error("Pool error - already initialized")]
    AlreadyInitialized,
    #[error("Pool error - locked or not initialized")]
    Locked,
    #[error("Pool error - callback paid less than owed")]
    InsufficientInputAmount,
    #[error("Pool error - flash loan not paid back with fees")]
    FlashLoanNotPaid,
    #[error("Pool error - per-tick liquidity cap exceeded")]
    TickLiquidityOverflow,
    #[error("Pool error - no such position")]
    PositionNotFound,
    #[error("Pool error - requested observation predates the oldest one")]
    ObservationTooOld,
    #[error("Pool error - token transfer failed")]
    TransferFailed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    MathError(#[from] MathError),

    #[error(transparent)]
    StateError(#[from] StateError),

    #[error(transparent)]
    SwapError(#[from] SwapError),

    #[error(transparent)]
    PoolError(#[from] PoolError),
}
