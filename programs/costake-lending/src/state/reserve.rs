use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    error::LendingError,
    math::{
        advance_index, checked_add, checked_sub, linear_interest, ray_div, ray_mul, scale, unscale,
        Rounding, RAY,
    },
};

use super::{IndexSnapshot, LedgerSide, ReserveConfig, ScaledBalanceLedger};

/// Accounting variant of a reserve's underlying
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveKind {
    Standard,
    /// Underlying whose own redemption value grows by `external_index` (ray)
    Rebasing { external_index: u128 },
}

/// One listed fungible asset
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct Reserve {
    /// Underlying asset; also its oracle key
    pub asset: Pubkey,

    pub config: ReserveConfig,

    pub kind: ReserveKind,

    /// Cumulated supply income (ray)
    pub liquidity_index: u128,

    /// Cumulated variable debt growth (ray)
    pub borrow_index: u128,

    /// Current supply rate (ray, annual)
    pub current_liquidity_rate: u128,

    /// Current borrow rate (ray, annual)
    pub current_borrow_rate: u128,

    pub last_update_timestamp: i64,

    /// Underlying held by the pool and free to lend, in units of the
    /// external index on rebasing reserves
    pub scaled_liquidity: u128,

    pub supply: ScaledBalanceLedger,

    pub debt: ScaledBalanceLedger,
}

impl Reserve {
    pub fn new(
        asset: Pubkey,
        config: ReserveConfig,
        kind: ReserveKind,
        now: i64,
    ) -> Result<Self, ProgramError> {
        config.validate()?;
        if let ReserveKind::Rebasing { external_index: 0 } = kind {
            return Err(LendingError::InvalidConfig.into());
        }
        let current_borrow_rate = config.borrow_rate;
        Ok(Self {
            asset,
            config,
            kind,
            liquidity_index: RAY,
            borrow_index: RAY,
            current_liquidity_rate: 0,
            current_borrow_rate,
            last_update_timestamp: now,
            scaled_liquidity: 0,
            supply: ScaledBalanceLedger::new(LedgerSide::Supply),
            debt: ScaledBalanceLedger::new(LedgerSide::Debt),
        })
    }

    pub fn external_index(&self) -> Option<u128> {
        match self.kind {
            ReserveKind::Standard => None,
            ReserveKind::Rebasing { external_index } => Some(external_index),
        }
    }

    /// Mirror the rebasing underlying's own index
    pub fn set_external_index(&mut self, index: u128) -> Result<(), ProgramError> {
        match &mut self.kind {
            ReserveKind::Standard => Err(LendingError::InvalidReserveKind.into()),
            ReserveKind::Rebasing { .. } if index == 0 => Err(LendingError::InvalidConfig.into()),
            ReserveKind::Rebasing { external_index } => {
                *external_index = index;
                Ok(())
            }
        }
    }

    /// Underlying held by the pool and free to lend; rebases with the
    /// external index like every supply balance does
    pub fn available_liquidity(&self) -> Result<u128, ProgramError> {
        match self.external_index() {
            None => Ok(self.scaled_liquidity),
            Some(index) => unscale(self.scaled_liquidity, index, Rounding::Down),
        }
    }

    pub fn add_liquidity(&mut self, amount: u128) -> Result<(), ProgramError> {
        let scaled = match self.external_index() {
            None => amount,
            Some(index) => scale(amount, index, Rounding::Down)?,
        };
        self.scaled_liquidity = checked_add(self.scaled_liquidity, scaled)?;
        Ok(())
    }

    /// Fails with `InsufficientLiquidity` past `available_liquidity`
    pub fn remove_liquidity(&mut self, amount: u128) -> Result<(), ProgramError> {
        let available = self.available_liquidity()?;
        if amount > available {
            msg!("{} exceeds available liquidity {}", amount, available);
            return Err(LendingError::InsufficientLiquidity.into());
        }
        let scaled = match self.external_index() {
            None => amount,
            Some(index) => scale(amount, index, Rounding::Up)?.min(self.scaled_liquidity),
        };
        self.scaled_liquidity = checked_sub(self.scaled_liquidity, scaled)?;
        Ok(())
    }

    fn elapsed(&self, now: i64) -> u64 {
        now.saturating_sub(self.last_update_timestamp).max(0) as u64
    }

    /// Liquidity index as of `now`, without writing
    pub fn normalized_income(&self, now: i64) -> Result<u128, ProgramError> {
        let elapsed = self.elapsed(now);
        if elapsed == 0 || self.current_liquidity_rate == 0 {
            return Ok(self.liquidity_index);
        }
        ray_mul(
            linear_interest(self.current_liquidity_rate, elapsed)?,
            self.liquidity_index,
            Rounding::Down,
        )
    }

    /// Borrow index as of `now`, without writing
    pub fn normalized_debt(&self, now: i64) -> Result<u128, ProgramError> {
        let elapsed = self.elapsed(now);
        if elapsed == 0 || self.current_borrow_rate == 0 {
            return Ok(self.borrow_index);
        }
        ray_mul(
            linear_interest(self.current_borrow_rate, elapsed)?,
            self.borrow_index,
            Rounding::Up,
        )
    }

    /// Accrue both indices up to `now`
    pub fn update_state(&mut self, now: i64) -> Result<(), ProgramError> {
        if now <= self.last_update_timestamp {
            return Ok(());
        }
        let liquidity_index = self.normalized_income(now)?;
        let borrow_index = self.normalized_debt(now)?;
        self.liquidity_index = advance_index(self.liquidity_index, liquidity_index);
        self.borrow_index = advance_index(self.borrow_index, borrow_index);
        self.last_update_timestamp = now;
        Ok(())
    }

    /// Recompute the supply rate from utilization
    pub fn update_interest_rates(&mut self, now: i64) -> Result<(), ProgramError> {
        let total_debt = self.debt.total_supply(&self.debt_snapshot(now)?)?;
        let total = checked_add(total_debt, self.available_liquidity()?)?;
        self.current_borrow_rate = self.config.borrow_rate;
        self.current_liquidity_rate = if total == 0 {
            0
        } else {
            let utilization = ray_div(total_debt, total, Rounding::Down)?;
            ray_mul(self.current_borrow_rate, utilization, Rounding::Down)?
        };
        msg!(
            "Reserve {} rates: borrow={} liquidity={}",
            self.asset,
            self.current_borrow_rate,
            self.current_liquidity_rate
        );
        Ok(())
    }

    pub fn supply_snapshot(&self, now: i64) -> Result<IndexSnapshot, ProgramError> {
        Ok(IndexSnapshot {
            index: self.normalized_income(now)?,
            external_index: self.external_index(),
        })
    }

    pub fn debt_snapshot(&self, now: i64) -> Result<IndexSnapshot, ProgramError> {
        Ok(IndexSnapshot {
            index: self.normalized_debt(now)?,
            external_index: self.external_index(),
        })
    }

    pub fn snapshot(&self, side: LedgerSide, now: i64) -> Result<IndexSnapshot, ProgramError> {
        match side {
            LedgerSide::Supply => self.supply_snapshot(now),
            LedgerSide::Debt => self.debt_snapshot(now),
        }
    }

    pub fn ledger(&self, side: LedgerSide) -> &ScaledBalanceLedger {
        match side {
            LedgerSide::Supply => &self.supply,
            LedgerSide::Debt => &self.debt,
        }
    }
}
