//! Lending pool engine
//!
//! `LendingPool` owns every ledger plus the external collaborators. Public
//! mutating operations run inside `atomic`, so a failed operation leaves no
//! partial effect.

pub mod account;
pub mod lending;
pub mod liquidation;
pub mod staking;

pub use account::*;
pub use liquidation::*;
pub use staking::*;

use std::collections::{BTreeMap, BTreeSet};

use solana_program::{msg, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    access_control::{AccessControl, Role},
    error::LendingError,
    interfaces::{NftRegistry, PoolId, PriceOracle, StakingSystem},
    math::{checked_add, scale, Rounding},
    state::{
        DerivativeLedger, LedgerSide, NftCollectionConfig, NftPosition, PoolConfig, Reserve,
        ReserveConfig, ReserveKind, TokenWallets,
    },
};

#[derive(Debug, Clone)]
pub struct LendingPool<O, S, N> {
    /// Custody address of the pool
    pub address: Pubkey,

    pub config: PoolConfig,

    pub acl: AccessControl,

    pub reserves: BTreeMap<Pubkey, Reserve>,

    pub collections: BTreeMap<Pubkey, NftCollectionConfig>,

    /// NFT positions keyed by (collection, token id)
    pub positions: BTreeMap<(Pubkey, u64), NftPosition>,

    pub derivative: DerivativeLedger,

    /// (user, asset) pairs whose supply counts as collateral
    pub collateral_flags: BTreeSet<(Pubkey, Pubkey)>,

    pub wallets: TokenWallets,

    pub oracle: O,

    pub staking: S,

    pub nfts: N,

    /// Pool clock (unix seconds)
    pub timestamp: i64,

    pub paused: bool,
}

impl<O, S, N> LendingPool<O, S, N>
where
    O: PriceOracle,
    S: StakingSystem,
    N: NftRegistry,
{
    pub fn new(
        address: Pubkey,
        admin: Pubkey,
        config: PoolConfig,
        oracle: O,
        staking: S,
        nfts: N,
    ) -> Result<Self, ProgramError> {
        config.validate()?;
        msg!("Initializing lending pool {} with admin {}", address, admin);
        Ok(Self {
            address,
            config,
            acl: AccessControl::new(admin),
            reserves: BTreeMap::new(),
            collections: BTreeMap::new(),
            positions: BTreeMap::new(),
            derivative: DerivativeLedger::new(),
            collateral_flags: BTreeSet::new(),
            wallets: TokenWallets::default(),
            oracle,
            staking,
            nfts,
            timestamp: 0,
            paused: false,
        })
    }

    /// Run `op` all-or-nothing: any error restores the pool to its prior state.
    ///
    /// The checkpoint is a full clone of the pool, every ledger and the
    /// collaborators included, so each call costs time and memory linear in
    /// the number of holders and positions.
    pub fn atomic<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, ProgramError>,
    ) -> Result<T, ProgramError> {
        let checkpoint = self.clone();
        let result = op(self);
        if let Err(err) = &result {
            msg!("Operation failed, rolling back: {:?}", err);
            *self = checkpoint;
        }
        result
    }

    // ---- clock ----

    pub fn set_timestamp(&mut self, now: i64) {
        self.timestamp = self.timestamp.max(now);
    }

    pub fn advance_time(&mut self, seconds: i64) {
        self.set_timestamp(self.timestamp.saturating_add(seconds));
    }

    // ---- administration ----

    pub fn init_reserve(
        &mut self,
        caller: &Pubkey,
        asset: Pubkey,
        config: ReserveConfig,
        kind: ReserveKind,
    ) -> Result<(), ProgramError> {
        self.acl.check_role(Role::PoolAdmin, caller)?;
        if self.reserves.contains_key(&asset) {
            return Err(LendingError::ReserveAlreadyExists.into());
        }
        let reserve = Reserve::new(asset, config, kind, self.timestamp)?;
        msg!("Listed reserve {} ({:?})", asset, kind);
        self.reserves.insert(asset, reserve);
        Ok(())
    }

    pub fn configure_reserve(
        &mut self,
        caller: &Pubkey,
        asset: &Pubkey,
        ltv_bps: u16,
        liquidation_threshold_bps: u16,
    ) -> Result<(), ProgramError> {
        self.acl.check_role(Role::RiskAdmin, caller)?;
        let now = self.timestamp;
        let reserve = self.reserve_mut(asset)?;
        let mut config = reserve.config.clone();
        config.ltv_bps = ltv_bps;
        config.liquidation_threshold_bps = liquidation_threshold_bps;
        config.validate()?;
        reserve.update_state(now)?;
        reserve.config = config;
        msg!(
            "Reserve {} risk params: ltv={} threshold={}",
            asset,
            ltv_bps,
            liquidation_threshold_bps
        );
        Ok(())
    }

    pub fn list_collection(
        &mut self,
        caller: &Pubkey,
        collection: Pubkey,
        config: NftCollectionConfig,
    ) -> Result<(), ProgramError> {
        self.acl.check_role(Role::PoolAdmin, caller)?;
        config.validate()?;
        if config.staking_pool == Some(self.config.staking.companion_pool) {
            msg!("Collection cannot stake into the paired pool");
            return Err(LendingError::InvalidConfig.into());
        }
        msg!("Listed collection {} (staking pool {:?})", collection, config.staking_pool);
        self.collections.insert(collection, config);
        Ok(())
    }

    pub fn set_paused(&mut self, caller: &Pubkey, paused: bool) -> Result<(), ProgramError> {
        self.acl.check_role(Role::EmergencyAdmin, caller)?;
        self.paused = paused;
        msg!("Pool paused: {}", paused);
        Ok(())
    }

    pub fn grant_role(
        &mut self,
        caller: &Pubkey,
        role: Role,
        account: Pubkey,
    ) -> Result<(), ProgramError> {
        self.acl.grant_role(caller, role, account)
    }

    pub fn revoke_role(
        &mut self,
        caller: &Pubkey,
        role: Role,
        account: &Pubkey,
    ) -> Result<(), ProgramError> {
        self.acl.revoke_role(caller, role, account)
    }

    pub fn has_role(&self, role: Role, account: &Pubkey) -> bool {
        self.acl.has_role(role, account)
    }

    /// Mirror a rebasing underlying's own index. No ledger entry is written.
    pub fn set_external_index(&mut self, asset: &Pubkey, index: u128) -> Result<(), ProgramError> {
        self.reserve_mut(asset)?.set_external_index(index)
    }

    // ---- queries ----

    pub fn reserve(&self, asset: &Pubkey) -> Result<&Reserve, ProgramError> {
        self.reserves
            .get(asset)
            .ok_or_else(|| LendingError::ReserveNotFound.into())
    }

    pub fn balance_of(
        &self,
        asset: &Pubkey,
        side: LedgerSide,
        user: &Pubkey,
    ) -> Result<u128, ProgramError> {
        let reserve = self.reserve(asset)?;
        reserve
            .ledger(side)
            .balance_of(user, &reserve.snapshot(side, self.timestamp)?)
    }

    pub fn scaled_balance_of(
        &self,
        asset: &Pubkey,
        side: LedgerSide,
        user: &Pubkey,
    ) -> Result<u128, ProgramError> {
        Ok(self.reserve(asset)?.ledger(side).scaled_balance_of(user))
    }

    pub fn total_supply(&self, asset: &Pubkey, side: LedgerSide) -> Result<u128, ProgramError> {
        let reserve = self.reserve(asset)?;
        reserve
            .ledger(side)
            .total_supply(&reserve.snapshot(side, self.timestamp)?)
    }

    pub fn scaled_total_supply(
        &self,
        asset: &Pubkey,
        side: LedgerSide,
    ) -> Result<u128, ProgramError> {
        Ok(self.reserve(asset)?.ledger(side).scaled_total_supply())
    }

    pub fn derivative_balance_of(&self, user: &Pubkey) -> u128 {
        self.derivative.balance_of(user)
    }

    /// Total principal staked across the user's NFT positions
    pub fn user_staking_amount(&self, user: &Pubkey) -> Result<u128, ProgramError> {
        self.positions
            .values()
            .filter(|position| position.owner == *user)
            .try_fold(0u128, |total, position| {
                checked_add(total, position.total_staked()?)
            })
    }

    pub fn position(&self, collection: &Pubkey, token_id: u64) -> Option<&NftPosition> {
        self.positions.get(&(*collection, token_id))
    }

    pub fn wallet_balance(&self, asset: &Pubkey, owner: &Pubkey) -> u128 {
        self.wallets.balance_of(asset, owner)
    }

    pub fn is_using_as_collateral(&self, user: &Pubkey, asset: &Pubkey) -> bool {
        self.collateral_flags.contains(&(*user, *asset))
    }

    // ---- internal helpers ----

    pub(crate) fn ensure_active(&self) -> Result<(), ProgramError> {
        if self.paused {
            return Err(LendingError::PoolPaused.into());
        }
        Ok(())
    }

    pub(crate) fn reserve_mut(&mut self, asset: &Pubkey) -> Result<&mut Reserve, ProgramError> {
        self.reserves
            .get_mut(asset)
            .ok_or_else(|| LendingError::ReserveNotFound.into())
    }

    /// Accrue the reserve's indices up to the pool clock
    pub(crate) fn accrue(&mut self, asset: &Pubkey) -> Result<(), ProgramError> {
        let now = self.timestamp;
        self.reserve_mut(asset)?.update_state(now)
    }

    pub(crate) fn staking_pool(&self, collection: &Pubkey) -> Result<PoolId, ProgramError> {
        self.collections
            .get(collection)
            .ok_or(LendingError::CollectionNotListed)?
            .staking_pool
            .ok_or_else(|| LendingError::StakingNotSupported.into())
    }

    pub(crate) fn position_mut(
        &mut self,
        collection: &Pubkey,
        token_id: u64,
    ) -> Result<&mut NftPosition, ProgramError> {
        self.positions
            .get_mut(&(*collection, token_id))
            .ok_or_else(|| LendingError::NotSupplied.into())
    }

    /// Position that exists and belongs to `owner`
    pub(crate) fn owned_position(
        &self,
        owner: &Pubkey,
        collection: &Pubkey,
        token_id: u64,
    ) -> Result<&NftPosition, ProgramError> {
        let position = self
            .position(collection, token_id)
            .ok_or(LendingError::NotSupplied)?;
        if position.owner != *owner {
            msg!("{} does not own {} #{}", owner, collection, token_id);
            return Err(LendingError::NotOwner.into());
        }
        Ok(position)
    }

    /// Owned position that is also posted as collateral
    pub(crate) fn owned_collateral_position(
        &self,
        owner: &Pubkey,
        collection: &Pubkey,
        token_id: u64,
    ) -> Result<&NftPosition, ProgramError> {
        let position = self.owned_position(owner, collection, token_id)?;
        if !position.use_as_collateral {
            return Err(LendingError::NotSupplied.into());
        }
        Ok(position)
    }

    /// Mint supply for funds already held by the pool
    pub(crate) fn supply_internal(
        &mut self,
        asset: &Pubkey,
        on_behalf_of: &Pubkey,
        amount: u128,
    ) -> Result<(), ProgramError> {
        self.accrue(asset)?;
        let now = self.timestamp;
        let reserve = self.reserve_mut(asset)?;
        if !reserve.config.active {
            return Err(LendingError::InvalidConfig.into());
        }
        let snapshot = reserve.supply_snapshot(now)?;
        let first_supply = reserve.supply.balance_of(on_behalf_of, &snapshot)? == 0;
        reserve.supply.mint(on_behalf_of, amount, &snapshot)?;
        reserve.add_liquidity(amount)?;
        reserve.update_interest_rates(now)?;

        if first_supply {
            self.collateral_flags.insert((*on_behalf_of, *asset));
        }
        msg!("Supplied {} of {} for {}", amount, asset, on_behalf_of);
        Ok(())
    }

    /// Supply pool-held funds as collateral; dust too small to mint a scaled
    /// unit goes to the owner's wallet instead
    pub(crate) fn settle_to_collateral(
        &mut self,
        asset: &Pubkey,
        owner: &Pubkey,
        amount: u128,
    ) -> Result<u128, ProgramError> {
        if amount == 0 {
            return Ok(0);
        }
        self.accrue(asset)?;
        let snapshot = self.reserve(asset)?.supply_snapshot(self.timestamp)?;
        if scale(amount, snapshot.index, Rounding::Down)? == 0 {
            self.wallets.credit(asset, owner, amount)?;
            return Ok(0);
        }
        self.supply_internal(asset, owner, amount)?;
        Ok(amount)
    }

    /// Repay debt with funds already held by the pool; returns the amount applied
    pub(crate) fn repay_internal(
        &mut self,
        asset: &Pubkey,
        on_behalf_of: &Pubkey,
        amount: u128,
    ) -> Result<u128, ProgramError> {
        self.accrue(asset)?;
        let now = self.timestamp;
        let reserve = self.reserve_mut(asset)?;
        let snapshot = reserve.debt_snapshot(now)?;
        let debt = reserve.debt.balance_of(on_behalf_of, &snapshot)?;
        let repaid = amount.min(debt);
        if repaid == 0 {
            return Ok(0);
        }
        reserve.debt.burn(on_behalf_of, repaid, &snapshot)?;
        reserve.add_liquidity(repaid)?;
        reserve.update_interest_rates(now)?;
        msg!("Repaid {} of {} for {}", repaid, asset, on_behalf_of);
        Ok(repaid)
    }

    /// Mint debt and release liquidity from the reserve into the pool's hands.
    /// Bounded by reserve liquidity and the borrower's available capacity.
    pub(crate) fn borrow_internal(
        &mut self,
        asset: &Pubkey,
        borrower: &Pubkey,
        amount: u128,
    ) -> Result<(), ProgramError> {
        if amount == 0 {
            return Err(LendingError::InvalidAmount.into());
        }
        self.accrue(asset)?;
        {
            let reserve = self.reserve(asset)?;
            if !reserve.config.active || !reserve.config.borrowing_enabled {
                return Err(LendingError::BorrowingDisabled.into());
            }
            let available = reserve.available_liquidity()?;
            if amount > available {
                msg!("Borrow {} exceeds available liquidity {}", amount, available);
                return Err(LendingError::InsufficientLiquidity.into());
            }
        }
        self.validate_borrow_capacity(borrower, asset, amount)?;

        let now = self.timestamp;
        let reserve = self.reserve_mut(asset)?;
        let snapshot = reserve.debt_snapshot(now)?;
        reserve.debt.mint(borrower, amount, &snapshot)?;
        reserve.remove_liquidity(amount)?;
        reserve.update_interest_rates(now)?;
        msg!("Borrowed {} of {} by {}", amount, asset, borrower);
        Ok(())
    }
}
