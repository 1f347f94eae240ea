use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::{
    error::LendingError,
    math::{checked_add, checked_sub},
};

/// Companion NFT jointly staked with a main token
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompanionPairing {
    pub companion_token_id: u64,
    /// Amount staked in the paired pool
    pub principal: u128,
}

/// Descriptive staking stage of a position; none of these are terminal
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakingStage {
    Unstaked,
    PartiallyStaked,
    FullyPaired,
}

/// NFT held by the pool on behalf of a supplier
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct NftPosition {
    pub collection: Pubkey,
    pub token_id: u64,
    pub owner: Pubkey,
    pub use_as_collateral: bool,
    /// Amount staked in the collection's main pool
    pub main_principal: u128,
    pub companion: Option<CompanionPairing>,
}

impl NftPosition {
    pub fn new(collection: Pubkey, token_id: u64, owner: Pubkey, use_as_collateral: bool) -> Self {
        Self {
            collection,
            token_id,
            owner,
            use_as_collateral,
            main_principal: 0,
            companion: None,
        }
    }

    pub fn total_staked(&self) -> Result<u128, ProgramError> {
        let companion = self.companion.map(|c| c.principal).unwrap_or(0);
        checked_add(self.main_principal, companion)
    }

    pub fn stage(&self) -> StakingStage {
        match (self.main_principal, self.companion) {
            (0, None) => StakingStage::Unstaked,
            (_, Some(pairing)) if pairing.principal > 0 => StakingStage::FullyPaired,
            _ => StakingStage::PartiallyStaked,
        }
    }

    pub fn is_staked(&self) -> bool {
        self.stage() != StakingStage::Unstaked
    }

    pub fn add_main_principal(&mut self, amount: u128) -> Result<(), ProgramError> {
        self.main_principal = checked_add(self.main_principal, amount)?;
        Ok(())
    }

    pub fn remove_main_principal(&mut self, amount: u128) -> Result<(), ProgramError> {
        if amount > self.main_principal {
            return Err(LendingError::InsufficientBalance.into());
        }
        self.main_principal -= amount;
        Ok(())
    }

    /// Check `companion_token_id` against the current pairing, if any
    pub fn check_companion(&self, companion_token_id: u64) -> Result<(), ProgramError> {
        match self.companion {
            Some(pairing) if pairing.companion_token_id != companion_token_id => {
                Err(LendingError::InvalidCompanionPairing.into())
            }
            _ => Ok(()),
        }
    }

    /// Create or extend the companion pairing
    pub fn add_companion_principal(
        &mut self,
        companion_token_id: u64,
        amount: u128,
    ) -> Result<(), ProgramError> {
        self.check_companion(companion_token_id)?;
        let principal = match self.companion {
            Some(pairing) => checked_add(pairing.principal, amount)?,
            None => amount,
        };
        self.companion = Some(CompanionPairing {
            companion_token_id,
            principal,
        });
        Ok(())
    }

    /// Reduce the pairing; a pairing withdrawn to zero is dropped
    pub fn remove_companion_principal(
        &mut self,
        companion_token_id: u64,
        amount: u128,
    ) -> Result<(), ProgramError> {
        let pairing = match self.companion {
            Some(pairing) if pairing.companion_token_id == companion_token_id => pairing,
            _ => return Err(LendingError::InvalidCompanionPairing.into()),
        };
        if amount > pairing.principal {
            return Err(LendingError::InsufficientBalance.into());
        }
        let remaining = checked_sub(pairing.principal, amount)?;
        self.companion = if remaining == 0 {
            None
        } else {
            Some(CompanionPairing {
                companion_token_id,
                principal: remaining,
            })
        };
        Ok(())
    }
}
