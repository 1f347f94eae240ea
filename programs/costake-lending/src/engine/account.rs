use solana_program::{msg, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    error::LendingError,
    interfaces::{NftRegistry, PriceOracle, StakingSystem},
    math::{
        checked_add, mul_div, unit, Rounding, HEALTH_FACTOR_LIQUIDATION_THRESHOLD,
        PERCENTAGE_FACTOR, WAD,
    },
};

use super::LendingPool;

/// Aggregate risk view of one user, in base currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserAccountData {
    pub total_collateral_base: u128,
    pub total_debt_base: u128,
    pub available_borrows_base: u128,
    /// Value-weighted liquidation threshold (bps)
    pub current_liquidation_threshold: u128,
    /// Value-weighted loan-to-value (bps)
    pub ltv: u128,
    /// Wad; `u128::MAX` when there is no debt
    pub health_factor: u128,
}

impl UserAccountData {
    pub fn is_healthy(&self) -> bool {
        self.health_factor > HEALTH_FACTOR_LIQUIDATION_THRESHOLD
    }

    pub fn is_liquidatable(&self) -> bool {
        self.health_factor < HEALTH_FACTOR_LIQUIDATION_THRESHOLD
    }
}

/// Running sums while walking a user's positions
#[derive(Default)]
struct AccountTotals {
    collateral: u128,
    /// Σ value × ltv_bps
    weighted_ltv: u128,
    /// Σ value × threshold_bps
    weighted_threshold: u128,
    debt: u128,
}

impl AccountTotals {
    fn add_collateral(
        &mut self,
        value: u128,
        ltv_bps: u16,
        threshold_bps: u16,
    ) -> Result<(), ProgramError> {
        let weigh = |bps: u16| {
            value
                .checked_mul(bps as u128)
                .ok_or(LendingError::MathOverflow)
        };
        self.collateral = checked_add(self.collateral, value)?;
        self.weighted_ltv = checked_add(self.weighted_ltv, weigh(ltv_bps)?)?;
        self.weighted_threshold = checked_add(self.weighted_threshold, weigh(threshold_bps)?)?;
        Ok(())
    }

    fn finish(self) -> Result<UserAccountData, ProgramError> {
        let (ltv, current_liquidation_threshold) = if self.collateral == 0 {
            (0, 0)
        } else {
            (
                self.weighted_ltv / self.collateral,
                self.weighted_threshold / self.collateral,
            )
        };
        let borrow_capacity = self.weighted_ltv / PERCENTAGE_FACTOR;
        let health_factor = if self.debt == 0 {
            u128::MAX
        } else {
            mul_div(
                self.weighted_threshold,
                WAD / PERCENTAGE_FACTOR,
                self.debt,
                Rounding::Down,
            )?
        };

        Ok(UserAccountData {
            total_collateral_base: self.collateral,
            total_debt_base: self.debt,
            available_borrows_base: borrow_capacity.saturating_sub(self.debt),
            current_liquidation_threshold,
            ltv,
            health_factor,
        })
    }
}

impl<O, S, N> LendingPool<O, S, N>
where
    O: PriceOracle,
    S: StakingSystem,
    N: NftRegistry,
{
    /// Oracle price that must be nonzero for any asset carrying a balance
    pub(crate) fn asset_price(&self, asset: &Pubkey) -> Result<u128, ProgramError> {
        let price = self.oracle.get_asset_price(asset)?;
        if price == 0 {
            msg!("Zero oracle price for {}", asset);
            return Err(LendingError::InvalidOraclePrice.into());
        }
        Ok(price)
    }

    /// Base-currency value of `amount` units of a fungible reserve asset
    pub(crate) fn value_of(
        &self,
        asset: &Pubkey,
        amount: u128,
        rounding: Rounding,
    ) -> Result<u128, ProgramError> {
        let decimals = self.reserve(asset)?.config.decimals;
        mul_div(amount, self.asset_price(asset)?, unit(decimals)?, rounding)
    }

    pub fn get_user_account_data(&self, user: &Pubkey) -> Result<UserAccountData, ProgramError> {
        let now = self.timestamp;
        let mut totals = AccountTotals::default();

        for (asset, reserve) in &self.reserves {
            if self.is_using_as_collateral(user, asset) {
                let balance = reserve.supply.balance_of(user, &reserve.supply_snapshot(now)?)?;
                if balance > 0 {
                    let value = self.value_of(asset, balance, Rounding::Down)?;
                    totals.add_collateral(
                        value,
                        reserve.config.ltv_bps,
                        reserve.config.liquidation_threshold_bps,
                    )?;
                }
            }

            let debt = reserve.debt.balance_of(user, &reserve.debt_snapshot(now)?)?;
            if debt > 0 {
                totals.debt = checked_add(totals.debt, self.value_of(asset, debt, Rounding::Up)?)?;
            }
        }

        let pledged = self
            .positions
            .values()
            .filter(|position| position.owner == *user && position.use_as_collateral);
        for position in pledged {
            let config = self
                .collections
                .get(&position.collection)
                .ok_or(LendingError::CollectionNotListed)?;
            totals.add_collateral(
                self.asset_price(&position.collection)?,
                config.ltv_bps,
                config.liquidation_threshold_bps,
            )?;
        }

        // Unclaimed staking rewards are not valued
        let staked = self.derivative.balance_of(user);
        if staked > 0 {
            let staking = &self.config.staking;
            totals.add_collateral(
                self.value_of(&staking.staked_asset, staked, Rounding::Down)?,
                staking.derivative_ltv_bps,
                staking.derivative_liquidation_threshold_bps,
            )?;
        }

        totals.finish()
    }

    pub fn health_factor(&self, user: &Pubkey) -> Result<u128, ProgramError> {
        Ok(self.get_user_account_data(user)?.health_factor)
    }

    /// Value-removing actions need a strictly healthy position
    pub(crate) fn ensure_healthy(&self, user: &Pubkey) -> Result<(), ProgramError> {
        let health_factor = self.health_factor(user)?;
        if health_factor <= HEALTH_FACTOR_LIQUIDATION_THRESHOLD {
            msg!("Health factor {} at or below threshold", health_factor);
            return Err(LendingError::HealthFactorBelowLiquidationThreshold.into());
        }
        Ok(())
    }

    /// Deleveraging actions may leave a position unsafe only if it was unsafe
    /// before and strictly improved
    pub(crate) fn ensure_deleveraging(
        &self,
        user: &Pubkey,
        health_factor_before: u128,
    ) -> Result<(), ProgramError> {
        let health_factor = self.health_factor(user)?;
        let healthy = health_factor > HEALTH_FACTOR_LIQUIDATION_THRESHOLD;
        let improved = health_factor_before <= HEALTH_FACTOR_LIQUIDATION_THRESHOLD
            && health_factor > health_factor_before;
        if !healthy && !improved {
            msg!(
                "Health factor {} -> {} rejected",
                health_factor_before,
                health_factor
            );
            return Err(LendingError::HealthFactorBelowLiquidationThreshold.into());
        }
        Ok(())
    }

    /// Third-party unwinds and liquidations need a strictly unsafe position
    pub(crate) fn ensure_liquidatable(&self, user: &Pubkey) -> Result<(), ProgramError> {
        let health_factor = self.health_factor(user)?;
        if health_factor >= HEALTH_FACTOR_LIQUIDATION_THRESHOLD {
            msg!("Health factor {} not below threshold", health_factor);
            return Err(LendingError::HealthFactorNotBelowThreshold.into());
        }
        Ok(())
    }

    /// Capacity check applied to every new borrow
    pub(crate) fn validate_borrow_capacity(
        &self,
        borrower: &Pubkey,
        asset: &Pubkey,
        amount: u128,
    ) -> Result<(), ProgramError> {
        let account = self.get_user_account_data(borrower)?;
        let requested = self.value_of(asset, amount, Rounding::Up)?;
        if account.total_collateral_base == 0 || requested > account.available_borrows_base {
            msg!(
                "Borrow of {} base exceeds available {}",
                requested,
                account.available_borrows_base
            );
            return Err(LendingError::CollateralCannotCoverNewBorrow.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_without_debt() {
        let mut totals = AccountTotals::default();
        totals.add_collateral(50 * WAD, 3_250, 7_000).unwrap();
        let data = totals.finish().unwrap();

        assert_eq!(data.total_collateral_base, 50 * WAD);
        assert_eq!(data.available_borrows_base, 16_250_000_000_000_000_000);
        assert_eq!(data.health_factor, u128::MAX);
        assert_eq!(data.ltv, 3_250);
        assert!(data.is_healthy());
    }

    #[test]
    fn test_weighted_averages_and_health() {
        // 50 @ 40%/70% plus 8 @ 20%/70%, debt 8
        let mut totals = AccountTotals::default();
        totals.add_collateral(50 * WAD, 4_000, 7_000).unwrap();
        totals.add_collateral(8 * WAD, 2_000, 7_000).unwrap();
        totals.debt = 8 * WAD;
        let data = totals.finish().unwrap();

        assert_eq!(data.total_collateral_base, 58 * WAD);
        // 20 + 1.6 - 8
        assert_eq!(data.available_borrows_base, 13_600_000_000_000_000_000);
        assert_eq!(data.current_liquidation_threshold, 7_000);
        // 58 * 0.7 / 8 = 5.075
        assert_eq!(data.health_factor, 5_075_000_000_000_000_000);
    }

    #[test]
    fn test_debt_above_capacity_saturates() {
        let mut totals = AccountTotals::default();
        totals.add_collateral(10 * WAD, 3_250, 7_000).unwrap();
        totals.debt = 15 * WAD;
        let data = totals.finish().unwrap();

        assert_eq!(data.available_borrows_base, 0);
        assert!(data.is_liquidatable());
    }
}
