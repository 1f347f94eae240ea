//! In-memory collaborators for local simulation and tests

use std::collections::{BTreeMap, BTreeSet};

use solana_program::{msg, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    error::LendingError,
    interfaces::{NftRegistry, PriceOracle, StakePosition, StakingSystem},
    math::checked_add,
};

/// Fixed price table; unknown assets price at zero
#[derive(Debug, Clone, Default)]
pub struct MockOracle {
    pub prices: BTreeMap<Pubkey, u128>,
}

impl MockOracle {
    pub fn set_price(&mut self, asset: Pubkey, price: u128) {
        self.prices.insert(asset, price);
    }
}

impl PriceOracle for MockOracle {
    fn get_asset_price(&self, asset: &Pubkey) -> Result<u128, ProgramError> {
        Ok(self.prices.get(asset).copied().unwrap_or(0))
    }
}

/// Staking system whose rewards are credited by hand
#[derive(Debug, Clone, Default)]
pub struct MockStaking {
    pub staked: BTreeMap<StakePosition, u128>,
    pub rewards: BTreeMap<StakePosition, u128>,
}

impl MockStaking {
    /// Credit pending rewards to a position
    pub fn accrue_rewards(&mut self, position: StakePosition, amount: u128) {
        *self.rewards.entry(position).or_insert(0) += amount;
    }

    pub fn staked_amount(&self, position: &StakePosition) -> u128 {
        self.staked.get(position).copied().unwrap_or(0)
    }

    pub fn total_staked(&self) -> u128 {
        self.staked.values().sum()
    }
}

impl StakingSystem for MockStaking {
    fn stake(&mut self, position: &StakePosition, amount: u128) -> Result<(), ProgramError> {
        let staked = self.staked.entry(*position).or_insert(0);
        *staked = checked_add(*staked, amount)?;
        Ok(())
    }

    fn unstake(&mut self, position: &StakePosition, amount: u128) -> Result<u128, ProgramError> {
        let staked = self.staked.entry(*position).or_insert(0);
        if *staked < amount {
            msg!("Unstake {} exceeds staked {}", amount, staked);
            return Err(LendingError::InsufficientBalance.into());
        }
        *staked -= amount;
        Ok(amount)
    }

    fn pending_rewards(&self, position: &StakePosition) -> Result<u128, ProgramError> {
        Ok(self.rewards.get(position).copied().unwrap_or(0))
    }

    fn claim(&mut self, position: &StakePosition) -> Result<u128, ProgramError> {
        Ok(self.rewards.remove(position).unwrap_or(0))
    }
}

/// NFT ownership with operator approvals
#[derive(Debug, Clone, Default)]
pub struct MockNftRegistry {
    pub owners: BTreeMap<(Pubkey, u64), Pubkey>,
    /// (owner, operator) pairs approved for all of the owner's tokens
    pub approvals: BTreeSet<(Pubkey, Pubkey)>,
}

impl MockNftRegistry {
    pub fn mint(&mut self, collection: Pubkey, token_id: u64, owner: Pubkey) {
        self.owners.insert((collection, token_id), owner);
    }

    pub fn set_approval_for_all(&mut self, owner: Pubkey, operator: Pubkey, approved: bool) {
        if approved {
            self.approvals.insert((owner, operator));
        } else {
            self.approvals.remove(&(owner, operator));
        }
    }

    pub fn balance_of(&self, collection: &Pubkey, owner: &Pubkey) -> usize {
        self.owners
            .iter()
            .filter(|((c, _), o)| c == collection && *o == owner)
            .count()
    }
}

impl NftRegistry for MockNftRegistry {
    fn owner_of(&self, collection: &Pubkey, token_id: u64) -> Option<Pubkey> {
        self.owners.get(&(*collection, token_id)).copied()
    }

    fn transfer_from(
        &mut self,
        operator: &Pubkey,
        collection: &Pubkey,
        from: &Pubkey,
        to: &Pubkey,
        token_id: u64,
    ) -> Result<(), ProgramError> {
        let authorized = operator == from || self.approvals.contains(&(*from, *operator));
        match self.owners.get_mut(&(*collection, token_id)) {
            Some(owner) if owner == from && authorized => {
                *owner = *to;
                Ok(())
            }
            _ => {
                msg!("transfer caller is not owner nor approved");
                Err(ProgramError::IllegalOwner)
            }
        }
    }
}
