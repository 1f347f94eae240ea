//! Staking of pool-held NFTs into the external staking system

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    error::LendingError,
    interfaces::{NftRegistry, PoolId, PriceOracle, StakePosition, StakingSystem},
    math::{checked_add, checked_sub},
};

use super::LendingPool;

/// How a `stake_and_borrow` call is paid for
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StakeFunding {
    /// Borrowed from the staked-asset reserve
    pub borrow_amount: u128,
    /// Taken from the caller's wallet
    pub cash_amount: u128,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MainStakeOp {
    pub token_id: u64,
    pub amount: u128,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompanionStakeOp {
    pub main_token_id: u64,
    pub companion_token_id: u64,
    pub amount: u128,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompanionClaim {
    pub main_token_id: u64,
    pub companion_token_id: u64,
}

/// What a forced or voluntary unwind realized
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnwindOutcome {
    /// Principal released from both pools
    pub unstaked: u128,
    /// Main pool rewards, settled like principal
    pub rewards: u128,
    /// Paired pool rewards, paid to the owner's wallet
    pub companion_rewards: u128,
    /// Staked-asset debt repaid for the owner
    pub repaid: u128,
    /// Remainder supplied as the owner's collateral
    pub supplied: u128,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClaimOutcome {
    /// Main pool rewards staked back into the main pool
    pub restaked: u128,
    /// Paired pool rewards paid to the owner's wallet
    pub paid_out: u128,
}

impl<O, S, N> LendingPool<O, S, N>
where
    O: PriceOracle,
    S: StakingSystem,
    N: NftRegistry,
{
    /// Stake against supplied NFTs, funded by a mix of borrowing and cash.
    /// The op amounts must add up to exactly `borrow_amount + cash_amount`.
    pub fn stake_and_borrow(
        &mut self,
        caller: &Pubkey,
        collection: &Pubkey,
        funding: StakeFunding,
        main_ops: &[MainStakeOp],
        companion_ops: &[CompanionStakeOp],
    ) -> Result<(), ProgramError> {
        self.atomic(|pool| {
            pool.ensure_active()?;
            let main_pool = pool.staking_pool(collection)?;
            let staking = pool.config.staking.clone();

            let mut total = 0u128;
            for op in main_ops {
                pool.owned_collateral_position(caller, collection, op.token_id)?;
                total = checked_add(total, pool.checked_stake_amount(op.amount)?)?;
            }
            for (i, op) in companion_ops.iter().enumerate() {
                pool.owned_collateral_position(caller, collection, op.main_token_id)?
                    .check_companion(op.companion_token_id)?;
                let repeated = companion_ops[..i].iter().any(|other| {
                    other.companion_token_id == op.companion_token_id
                        && other.main_token_id != op.main_token_id
                });
                if repeated
                    || pool.companion_paired_elsewhere(
                        collection,
                        op.main_token_id,
                        op.companion_token_id,
                    )
                {
                    msg!("Companion #{} is already paired", op.companion_token_id);
                    return Err(LendingError::InvalidCompanionPairing.into());
                }
                total = checked_add(total, pool.checked_stake_amount(op.amount)?)?;
            }

            let funded = checked_add(funding.borrow_amount, funding.cash_amount)?;
            if total != funded {
                msg!("Stake ops total {} but funding is {}", total, funded);
                return Err(LendingError::StakingAmountMismatch.into());
            }
            if total == 0 {
                return Err(LendingError::InvalidAmount.into());
            }

            if funding.cash_amount > 0 {
                pool.wallets
                    .debit(&staking.staked_asset, caller, funding.cash_amount)?;
            }
            if funding.borrow_amount > 0 {
                pool.borrow_internal(&staking.staked_asset, caller, funding.borrow_amount)?;
            }

            for op in main_ops {
                let position = StakePosition::Main {
                    pool: main_pool,
                    token_id: op.token_id,
                };
                pool.staking.stake(&position, op.amount)?;
                pool.position_mut(collection, op.token_id)?
                    .add_main_principal(op.amount)?;
            }
            for op in companion_ops {
                pool.take_companion(caller, op.companion_token_id)?;
                let position = paired(main_pool, op.main_token_id, op.companion_token_id);
                pool.staking.stake(&position, op.amount)?;
                pool.position_mut(collection, op.main_token_id)?
                    .add_companion_principal(op.companion_token_id, op.amount)?;
                pool.return_companion(caller, op.companion_token_id)?;
            }

            pool.derivative.mint(caller, total)?;
            msg!(
                "Staked {} for {} (borrowed {}, cash {})",
                total,
                caller,
                funding.borrow_amount,
                funding.cash_amount
            );
            Ok(())
        })
    }

    /// Withdraw main pool principal and supply it back as the caller's
    /// collateral. A full withdrawal also claims the token's main pool
    /// rewards. Returns the amount settled.
    pub fn withdraw_main_stake(
        &mut self,
        caller: &Pubkey,
        collection: &Pubkey,
        ops: &[MainStakeOp],
    ) -> Result<u128, ProgramError> {
        self.atomic(|pool| {
            pool.ensure_active()?;
            let main_pool = pool.staking_pool(collection)?;
            let staked_asset = pool.config.staking.staked_asset;
            let health_factor_before = pool.health_factor(caller)?;

            let mut withdrawn = 0u128;
            for op in ops {
                if op.amount == 0 {
                    return Err(LendingError::InvalidAmount.into());
                }
                let principal = pool
                    .owned_position(caller, collection, op.token_id)?
                    .main_principal;
                if op.amount > principal {
                    msg!("Withdraw {} exceeds staked {}", op.amount, principal);
                    return Err(LendingError::InsufficientBalance.into());
                }
                let position = StakePosition::Main {
                    pool: main_pool,
                    token_id: op.token_id,
                };
                let mut released = pool.staking.unstake(&position, op.amount)?;
                if op.amount == principal {
                    let rewards = pool.staking.claim(&position)?;
                    released = checked_add(released, rewards)?;
                }
                pool.position_mut(collection, op.token_id)?
                    .remove_main_principal(op.amount)?;
                pool.derivative.burn(caller, op.amount)?;
                withdrawn = checked_add(withdrawn, released)?;
            }

            pool.settle_to_collateral(&staked_asset, caller, withdrawn)?;
            pool.ensure_deleveraging(caller, health_factor_before)?;
            msg!("Withdrew {} of main stake for {}", withdrawn, caller);
            Ok(withdrawn)
        })
    }

    /// Withdraw paired pool principal to the caller's wallet. A full
    /// withdrawal dissolves the pairing and pays out its rewards.
    /// Returns the amount withdrawn.
    pub fn withdraw_companion_stake(
        &mut self,
        caller: &Pubkey,
        collection: &Pubkey,
        ops: &[CompanionStakeOp],
    ) -> Result<u128, ProgramError> {
        self.atomic(|pool| {
            pool.ensure_active()?;
            let main_pool = pool.staking_pool(collection)?;
            let staked_asset = pool.config.staking.staked_asset;
            let health_factor_before = pool.health_factor(caller)?;

            let mut withdrawn = 0u128;
            for op in ops {
                if op.amount == 0 {
                    return Err(LendingError::InvalidAmount.into());
                }
                let pairing = pool
                    .owned_position(caller, collection, op.main_token_id)?
                    .companion
                    .filter(|pairing| pairing.companion_token_id == op.companion_token_id)
                    .ok_or(LendingError::InvalidCompanionPairing)?;
                if op.amount > pairing.principal {
                    msg!("Withdraw {} exceeds paired stake {}", op.amount, pairing.principal);
                    return Err(LendingError::InsufficientBalance.into());
                }
                let full = op.amount == pairing.principal;
                let position = paired(main_pool, op.main_token_id, op.companion_token_id);

                if !full {
                    pool.take_companion(caller, op.companion_token_id)?;
                }
                let mut released = pool.staking.unstake(&position, op.amount)?;
                if full {
                    let rewards = pool.staking.claim(&position)?;
                    released = checked_add(released, rewards)?;
                }
                pool.position_mut(collection, op.main_token_id)?
                    .remove_companion_principal(op.companion_token_id, op.amount)?;
                pool.derivative.burn(caller, op.amount)?;
                if !full {
                    pool.return_companion(caller, op.companion_token_id)?;
                }
                withdrawn = checked_add(withdrawn, released)?;
            }

            pool.wallets.credit(&staked_asset, caller, withdrawn)?;
            pool.ensure_deleveraging(caller, health_factor_before)?;
            msg!("Withdrew {} of paired stake for {}", withdrawn, caller);
            Ok(withdrawn)
        })
    }

    /// Restake main pool rewards and pay out paired pool rewards for each pair
    pub fn claim_companion_rewards(
        &mut self,
        caller: &Pubkey,
        collection: &Pubkey,
        claims: &[CompanionClaim],
    ) -> Result<ClaimOutcome, ProgramError> {
        self.atomic(|pool| {
            pool.ensure_active()?;
            let main_pool = pool.staking_pool(collection)?;
            let staked_asset = pool.config.staking.staked_asset;

            let mut outcome = ClaimOutcome::default();
            for claim in claims {
                let paired_with = pool
                    .owned_position(caller, collection, claim.main_token_id)?
                    .companion
                    .map(|pairing| pairing.companion_token_id);
                if paired_with != Some(claim.companion_token_id) {
                    return Err(LendingError::InvalidCompanionPairing.into());
                }
                pool.take_companion(caller, claim.companion_token_id)?;

                let main = StakePosition::Main {
                    pool: main_pool,
                    token_id: claim.main_token_id,
                };
                let restaked = pool.staking.claim(&main)?;
                if restaked > 0 {
                    pool.staking.stake(&main, restaked)?;
                    pool.position_mut(collection, claim.main_token_id)?
                        .add_main_principal(restaked)?;
                    pool.derivative.mint(caller, restaked)?;
                }

                let position = paired(main_pool, claim.main_token_id, claim.companion_token_id);
                let paid_out = pool.staking.claim(&position)?;
                pool.wallets.credit(&staked_asset, caller, paid_out)?;

                pool.return_companion(caller, claim.companion_token_id)?;
                outcome.restaked = checked_add(outcome.restaked, restaked)?;
                outcome.paid_out = checked_add(outcome.paid_out, paid_out)?;
            }

            msg!(
                "Claimed for {}: restaked {}, paid out {}",
                caller,
                outcome.restaked,
                outcome.paid_out
            );
            Ok(outcome)
        })
    }

    /// Pay pending main pool rewards to the caller's wallet
    pub fn claim_main_rewards(
        &mut self,
        caller: &Pubkey,
        collection: &Pubkey,
        token_ids: &[u64],
    ) -> Result<u128, ProgramError> {
        self.atomic(|pool| {
            pool.ensure_active()?;
            let main_pool = pool.staking_pool(collection)?;
            let staked_asset = pool.config.staking.staked_asset;
            pool.ensure_healthy(caller)?;

            let mut claimed = 0u128;
            for &token_id in token_ids {
                pool.owned_position(caller, collection, token_id)?;
                let rewards = pool
                    .staking
                    .claim(&StakePosition::Main { pool: main_pool, token_id })?;
                claimed = checked_add(claimed, rewards)?;
            }

            pool.wallets.credit(&staked_asset, caller, claimed)?;
            msg!("Claimed {} main rewards for {}", claimed, caller);
            Ok(claimed)
        })
    }

    /// Unwind every stake on one NFT. The owner may always call this; anyone
    /// else only while the owner's health factor is below one.
    pub fn unstake_and_repay(
        &mut self,
        caller: &Pubkey,
        collection: &Pubkey,
        token_id: u64,
    ) -> Result<UnwindOutcome, ProgramError> {
        self.atomic(|pool| {
            pool.ensure_active()?;
            let owner = pool
                .position(collection, token_id)
                .ok_or(LendingError::NotSupplied)?
                .owner;
            if *caller != owner {
                pool.ensure_liquidatable(&owner)?;
            }
            pool.unwind_position(&owner, collection, token_id)
        })
    }

    /// Release every stake held for one NFT and settle the proceeds for its
    /// owner: debt in the staked asset first, then collateral
    pub(crate) fn unwind_position(
        &mut self,
        owner: &Pubkey,
        collection: &Pubkey,
        token_id: u64,
    ) -> Result<UnwindOutcome, ProgramError> {
        let main_pool = self.staking_pool(collection)?;
        let staked_asset = self.config.staking.staked_asset;
        let position = self.owned_position(owner, collection, token_id)?.clone();
        let mut outcome = UnwindOutcome::default();

        let main = StakePosition::Main {
            pool: main_pool,
            token_id,
        };
        if position.main_principal > 0 {
            outcome.unstaked = self.staking.unstake(&main, position.main_principal)?;
        }
        outcome.rewards = self.staking.claim(&main)?;

        if let Some(pairing) = position.companion {
            let paired_position = paired(main_pool, token_id, pairing.companion_token_id);
            let released = self.staking.unstake(&paired_position, pairing.principal)?;
            outcome.unstaked = checked_add(outcome.unstaked, released)?;
            outcome.companion_rewards = self.staking.claim(&paired_position)?;
            self.wallets
                .credit(&staked_asset, owner, outcome.companion_rewards)?;
        }

        self.derivative.burn(owner, position.total_staked()?)?;
        let entry = self.position_mut(collection, token_id)?;
        entry.main_principal = 0;
        entry.companion = None;

        let proceeds = checked_add(outcome.unstaked, outcome.rewards)?;
        outcome.repaid = self.repay_internal(&staked_asset, owner, proceeds)?;
        let remainder = checked_sub(proceeds, outcome.repaid)?;
        outcome.supplied = self.settle_to_collateral(&staked_asset, owner, remainder)?;

        msg!(
            "Unwound {} #{}: unstaked {}, repaid {}, supplied {}",
            collection,
            token_id,
            outcome.unstaked,
            outcome.repaid,
            outcome.supplied
        );
        Ok(outcome)
    }

    /// Whether a token still holds principal or unclaimed main pool rewards
    /// that must be unwound before it changes hands
    pub(crate) fn needs_unwind(
        &self,
        collection: &Pubkey,
        token_id: u64,
    ) -> Result<bool, ProgramError> {
        let position = self
            .position(collection, token_id)
            .ok_or(LendingError::NotSupplied)?;
        if position.is_staked() {
            return Ok(true);
        }
        let main_pool = match self.collections.get(collection).and_then(|c| c.staking_pool) {
            Some(main_pool) => main_pool,
            None => return Ok(false),
        };
        let main = StakePosition::Main {
            pool: main_pool,
            token_id,
        };
        Ok(self.staking.pending_rewards(&main)? > 0)
    }

    /// Whether a companion token backs a pairing on any token other than
    /// `main_token_id` of `collection`
    fn companion_paired_elsewhere(
        &self,
        collection: &Pubkey,
        main_token_id: u64,
        companion_token_id: u64,
    ) -> bool {
        self.positions.iter().any(|(key, position)| {
            *key != (*collection, main_token_id)
                && position
                    .companion
                    .map_or(false, |pairing| pairing.companion_token_id == companion_token_id)
        })
    }

    fn checked_stake_amount(&self, amount: u128) -> Result<u128, ProgramError> {
        if amount < self.config.staking.min_stake_amount {
            msg!(
                "Stake {} below minimum {}",
                amount,
                self.config.staking.min_stake_amount
            );
            return Err(LendingError::BelowMinimumStake.into());
        }
        Ok(amount)
    }

    /// Pull a companion NFT into pool custody for the duration of a call
    fn take_companion(
        &mut self,
        owner: &Pubkey,
        companion_token_id: u64,
    ) -> Result<(), ProgramError> {
        let custody = self.address;
        let companion = self.config.staking.companion_collection;
        self.nfts
            .transfer_from(&custody, &companion, owner, &custody, companion_token_id)
    }

    fn return_companion(
        &mut self,
        owner: &Pubkey,
        companion_token_id: u64,
    ) -> Result<(), ProgramError> {
        let custody = self.address;
        let companion = self.config.staking.companion_collection;
        self.nfts
            .transfer_from(&custody, &companion, &custody, owner, companion_token_id)
    }
}

fn paired(main_pool: PoolId, main_token_id: u64, companion_token_id: u64) -> StakePosition {
    StakePosition::Paired {
        main_pool,
        main_token_id,
        companion_token_id,
    }
}
