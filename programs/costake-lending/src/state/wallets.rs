use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::{error::LendingError, math::checked_add};

/// Liquid token balances held outside the pool, keyed by (asset, owner)
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Default)]
pub struct TokenWallets {
    pub balances: BTreeMap<(Pubkey, Pubkey), u128>,
}

impl TokenWallets {
    pub fn balance_of(&self, asset: &Pubkey, owner: &Pubkey) -> u128 {
        self.balances.get(&(*asset, *owner)).copied().unwrap_or(0)
    }

    pub fn credit(
        &mut self,
        asset: &Pubkey,
        owner: &Pubkey,
        amount: u128,
    ) -> Result<(), ProgramError> {
        let balance = self.balances.entry((*asset, *owner)).or_insert(0);
        *balance = checked_add(*balance, amount)?;
        Ok(())
    }

    pub fn debit(
        &mut self,
        asset: &Pubkey,
        owner: &Pubkey,
        amount: u128,
    ) -> Result<(), ProgramError> {
        let balance = self.balances.entry((*asset, *owner)).or_insert(0);
        if *balance < amount {
            return Err(LendingError::InsufficientBalance.into());
        }
        *balance -= amount;
        Ok(())
    }
}
