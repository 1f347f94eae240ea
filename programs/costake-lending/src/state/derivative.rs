use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::{
    error::LendingError,
    math::{checked_add, checked_sub},
};

/// Receipt for fungible asset currently staked on a holder's behalf.
/// Minted and burned 1:1 with staking principal; carries no yield.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Default)]
pub struct DerivativeLedger {
    pub balances: BTreeMap<Pubkey, u128>,
    pub total_supply: u128,
}

impl DerivativeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self, owner: &Pubkey, amount: u128) -> Result<(), ProgramError> {
        if amount == 0 {
            return Ok(());
        }
        let balance = self.balances.entry(*owner).or_insert(0);
        *balance = checked_add(*balance, amount)?;
        self.total_supply = checked_add(self.total_supply, amount)?;
        Ok(())
    }

    pub fn burn(&mut self, owner: &Pubkey, amount: u128) -> Result<(), ProgramError> {
        if amount == 0 {
            return Ok(());
        }
        let balance = self.balances.entry(*owner).or_insert(0);
        if *balance < amount {
            return Err(LendingError::InsufficientBalance.into());
        }
        *balance -= amount;
        self.total_supply = checked_sub(self.total_supply, amount)?;
        Ok(())
    }

    pub fn balance_of(&self, owner: &Pubkey) -> u128 {
        self.balances.get(owner).copied().unwrap_or(0)
    }
}
