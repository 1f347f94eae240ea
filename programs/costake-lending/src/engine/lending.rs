//! Fungible and NFT supply, borrow and transfer operations

use solana_program::{msg, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    error::LendingError,
    interfaces::{NftRegistry, PriceOracle, StakingSystem},
    state::{LedgerSide, NftPosition},
};

use super::LendingPool;

impl<O, S, N> LendingPool<O, S, N>
where
    O: PriceOracle,
    S: StakingSystem,
    N: NftRegistry,
{
    /// Deposit `amount` from the caller's wallet, credited to `on_behalf_of`
    pub fn supply(
        &mut self,
        caller: &Pubkey,
        asset: &Pubkey,
        amount: u128,
        on_behalf_of: &Pubkey,
    ) -> Result<(), ProgramError> {
        self.atomic(|pool| {
            pool.ensure_active()?;
            if amount == 0 {
                return Err(LendingError::InvalidAmount.into());
            }
            pool.reserve(asset)?;
            pool.wallets.debit(asset, caller, amount)?;
            pool.supply_internal(asset, on_behalf_of, amount)
        })
    }

    /// Withdraw supply to the caller's wallet; `u128::MAX` withdraws everything.
    /// Returns the amount withdrawn.
    pub fn withdraw(
        &mut self,
        caller: &Pubkey,
        asset: &Pubkey,
        amount: u128,
    ) -> Result<u128, ProgramError> {
        self.atomic(|pool| {
            pool.ensure_active()?;
            pool.accrue(asset)?;
            let backs_collateral = pool.is_using_as_collateral(caller, asset);

            let now = pool.timestamp;
            let reserve = pool.reserve_mut(asset)?;
            let snapshot = reserve.supply_snapshot(now)?;
            let balance = reserve.supply.balance_of(caller, &snapshot)?;
            let amount = if amount == u128::MAX { balance } else { amount };
            if amount == 0 {
                return Err(LendingError::InvalidAmount.into());
            }
            if amount > balance {
                msg!("Withdraw {} exceeds balance {}", amount, balance);
                return Err(LendingError::InsufficientBalance.into());
            }
            reserve.remove_liquidity(amount)?;
            reserve.supply.burn(caller, amount, &snapshot)?;
            reserve.update_interest_rates(now)?;
            let remaining = reserve.supply.balance_of(caller, &snapshot)?;

            pool.wallets.credit(asset, caller, amount)?;
            if remaining == 0 {
                pool.collateral_flags.remove(&(*caller, *asset));
            }
            if backs_collateral {
                pool.ensure_healthy(caller)?;
            }
            msg!("Withdrew {} of {} by {}", amount, asset, caller);
            Ok(amount)
        })
    }

    pub fn borrow(
        &mut self,
        caller: &Pubkey,
        asset: &Pubkey,
        amount: u128,
    ) -> Result<(), ProgramError> {
        self.atomic(|pool| {
            pool.ensure_active()?;
            pool.borrow_internal(asset, caller, amount)?;
            pool.wallets.credit(asset, caller, amount)
        })
    }

    /// Repay from the caller's wallet, capped at the outstanding debt;
    /// `u128::MAX` repays everything. Returns the amount repaid.
    pub fn repay(
        &mut self,
        caller: &Pubkey,
        asset: &Pubkey,
        amount: u128,
        on_behalf_of: &Pubkey,
    ) -> Result<u128, ProgramError> {
        self.atomic(|pool| {
            pool.ensure_active()?;
            pool.accrue(asset)?;
            let debt = pool.balance_of(asset, LedgerSide::Debt, on_behalf_of)?;
            let payment = amount.min(debt);
            if payment == 0 {
                msg!("Nothing to repay for {}", on_behalf_of);
                return Err(LendingError::InvalidAmount.into());
            }
            pool.wallets.debit(asset, caller, payment)?;
            pool.repay_internal(asset, on_behalf_of, payment)
        })
    }

    /// Move supply between holders at the current index
    pub fn transfer_supply(
        &mut self,
        caller: &Pubkey,
        asset: &Pubkey,
        to: &Pubkey,
        amount: u128,
    ) -> Result<(), ProgramError> {
        self.atomic(|pool| {
            pool.ensure_active()?;
            pool.accrue(asset)?;
            let backs_collateral = pool.is_using_as_collateral(caller, asset);

            let now = pool.timestamp;
            let reserve = pool.reserve_mut(asset)?;
            let snapshot = reserve.supply_snapshot(now)?;
            let receiver_was_empty = reserve.supply.balance_of(to, &snapshot)? == 0;
            reserve.supply.transfer(caller, to, amount, &snapshot)?;
            let sender_left = reserve.supply.balance_of(caller, &snapshot)?;

            if caller != to {
                if receiver_was_empty {
                    pool.collateral_flags.insert((*to, *asset));
                }
                if sender_left == 0 {
                    pool.collateral_flags.remove(&(*caller, *asset));
                }
            }
            if backs_collateral {
                pool.ensure_healthy(caller)?;
            }
            msg!("Transferred {} of {} from {} to {}", amount, asset, caller, to);
            Ok(())
        })
    }

    pub fn set_use_reserve_as_collateral(
        &mut self,
        caller: &Pubkey,
        asset: &Pubkey,
        enabled: bool,
    ) -> Result<(), ProgramError> {
        self.atomic(|pool| {
            pool.ensure_active()?;
            if enabled {
                if pool.balance_of(asset, LedgerSide::Supply, caller)? == 0 {
                    return Err(LendingError::InsufficientBalance.into());
                }
                pool.collateral_flags.insert((*caller, *asset));
            } else {
                pool.reserve(asset)?;
                pool.collateral_flags.remove(&(*caller, *asset));
                pool.ensure_healthy(caller)?;
            }
            msg!("{} collateral {} for {}", asset, enabled, caller);
            Ok(())
        })
    }

    /// Move an NFT into pool custody and open a position for it
    pub fn supply_nft(
        &mut self,
        caller: &Pubkey,
        collection: &Pubkey,
        token_id: u64,
        use_as_collateral: bool,
    ) -> Result<(), ProgramError> {
        self.atomic(|pool| {
            pool.ensure_active()?;
            if !pool.collections.contains_key(collection) {
                return Err(LendingError::CollectionNotListed.into());
            }
            if pool.position(collection, token_id).is_some() {
                return Err(LendingError::NftAlreadySupplied.into());
            }
            let custody = pool.address;
            pool.nfts
                .transfer_from(&custody, collection, caller, &custody, token_id)?;
            pool.positions.insert(
                (*collection, token_id),
                NftPosition::new(*collection, token_id, *caller, use_as_collateral),
            );
            msg!("Supplied {} #{} for {}", collection, token_id, caller);
            Ok(())
        })
    }

    /// Close a position and hand the NFT back, unwinding any stake first
    pub fn withdraw_nft(
        &mut self,
        caller: &Pubkey,
        collection: &Pubkey,
        token_id: u64,
    ) -> Result<(), ProgramError> {
        self.atomic(|pool| {
            pool.ensure_active()?;
            pool.owned_position(caller, collection, token_id)?;
            if pool.needs_unwind(collection, token_id)? {
                pool.unwind_position(caller, collection, token_id)?;
            }
            pool.positions.remove(&(*collection, token_id));
            let custody = pool.address;
            pool.nfts
                .transfer_from(&custody, collection, &custody, caller, token_id)?;
            pool.ensure_healthy(caller)?;
            msg!("Withdrew {} #{} to {}", collection, token_id, caller);
            Ok(())
        })
    }

    pub fn set_nft_collateral(
        &mut self,
        caller: &Pubkey,
        collection: &Pubkey,
        token_id: u64,
        enabled: bool,
    ) -> Result<(), ProgramError> {
        self.atomic(|pool| {
            pool.ensure_active()?;
            pool.owned_position(caller, collection, token_id)?;
            pool.position_mut(collection, token_id)?.use_as_collateral = enabled;
            if !enabled {
                pool.ensure_healthy(caller)?;
            }
            msg!("{} #{} collateral {}", collection, token_id, enabled);
            Ok(())
        })
    }

    /// Hand a supplied NFT position to another user. Any stake is unwound for
    /// the sender first and the receiver starts with collateral disabled.
    pub fn transfer_nft_collateral(
        &mut self,
        caller: &Pubkey,
        collection: &Pubkey,
        token_id: u64,
        to: &Pubkey,
    ) -> Result<(), ProgramError> {
        self.atomic(|pool| {
            pool.ensure_active()?;
            pool.owned_position(caller, collection, token_id)?;
            if pool.needs_unwind(collection, token_id)? {
                pool.unwind_position(caller, collection, token_id)?;
            }
            let position = pool.position_mut(collection, token_id)?;
            position.owner = *to;
            position.use_as_collateral = false;
            pool.ensure_healthy(caller)?;
            msg!("Transferred {} #{} from {} to {}", collection, token_id, caller, to);
            Ok(())
        })
    }
}
