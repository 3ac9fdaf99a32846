pub mod core;
pub mod events;
pub mod interfaces;
pub mod oracle;
pub mod position;
pub mod swap;
pub mod tick;

pub use self::core::{Pool, PoolConfig, Slot0};

#[cfg(test)]
pub(crate) mod test_util {
    use super::interfaces::{FlashCallback, MintCallback, SwapCallback, TokenLedger};
    use crate::FastMap;
    use alloy_primitives::{Address, I256, U256};

    pub fn addr(n: u8) -> Address {
        Address::with_last_byte(n)
    }

    /// In-memory balance book standing in for an asset contract.
    #[derive(Default)]
    pub struct MockToken {
        balances: FastMap<Address, U256>,
    }

    impl MockToken {
        pub fn funded(account: Address, amount: U256) -> Self {
            let mut token = Self::default();
            token.credit(account, amount);
            token
        }

        pub fn credit(&mut self, account: Address, amount: U256) {
            *self.balances.entry(account).or_default() += amount;
        }
    }

    impl TokenLedger for MockToken {
        fn balance_of(&self, account: Address) -> U256 {
            self.balances.get(&account).copied().unwrap_or_default()
        }

        fn transfer(&mut self, from: Address, to: Address, amount: U256) -> bool {
            let from_balance = self.balance_of(from);
            if from_balance < amount {
                return false;
            }
            self.balances.insert(from, from_balance - amount);
            *self.balances.entry(to).or_default() += amount;
            true
        }
    }

    /// Callback that pays whatever is owed from `payer`, scaled by
    /// `pay_num / pay_den` so shortfall cases can be exercised.
    pub struct Payer {
        pub payer: Address,
        pub pool: Address,
        pub pay_num: u64,
        pub pay_den: u64,
    }

    impl Payer {
        pub fn honest(payer: Address, pool: Address) -> Self {
            Self {
                payer,
                pool,
                pay_num: 1,
                pay_den: 1,
            }
        }

        fn pay(&self, token: &mut dyn TokenLedger, amount: U256) {
            let scaled = amount * U256::from(self.pay_num) / U256::from(self.pay_den);
            token.transfer(self.payer, self.pool, scaled);
        }
    }

    impl MintCallback for Payer {
        fn mint_callback(
            &mut self,
            token0: &mut dyn TokenLedger,
            token1: &mut dyn TokenLedger,
            amount0_owed: U256,
            amount1_owed: U256,
            _data: &[u8],
        ) {
            if !amount0_owed.is_zero() {
                self.pay(token0, amount0_owed);
            }
            if !amount1_owed.is_zero() {
                self.pay(token1, amount1_owed);
            }
        }
    }

    impl SwapCallback for Payer {
        fn swap_callback(
            &mut self,
            token0: &mut dyn TokenLedger,
            token1: &mut dyn TokenLedger,
            amount0_delta: I256,
            amount1_delta: I256,
            _data: &[u8],
        ) {
            if amount0_delta > I256::ZERO {
                self.pay(token0, amount0_delta.unsigned_abs());
            }
            if amount1_delta > I256::ZERO {
                self.pay(token1, amount1_delta.unsigned_abs());
            }
        }
    }

    /// Flash borrower repaying fixed amounts, regardless of what is owed.
    pub struct FlashRepayer {
        pub payer: Address,
        pub pool: Address,
        pub repay0: U256,
        pub repay1: U256,
    }

    impl FlashCallback for FlashRepayer {
        fn flash_callback(
            &mut self,
            token0: &mut dyn TokenLedger,
            token1: &mut dyn TokenLedger,
            _fee0: U256,
            _fee1: U256,
            _data: &[u8],
        ) {
            if !self.repay0.is_zero() {
                token0.transfer(self.payer, self.pool, self.repay0);
            }
            if !self.repay1.is_zero() {
                token1.transfer(self.payer, self.pool, self.repay1);
            }
        }
    }
}
