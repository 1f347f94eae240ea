use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    error::LendingError,
    interfaces::PoolId,
    math::{unit, PERCENTAGE_FACTOR, RAY},
};

/// Risk parameters for one fungible reserve
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct ReserveConfig {
    /// Loan-to-value in basis points
    pub ltv_bps: u16,

    /// Liquidation threshold in basis points
    pub liquidation_threshold_bps: u16,

    /// Token decimals of the underlying
    pub decimals: u8,

    /// Annual variable borrow rate (ray)
    pub borrow_rate: u128,

    pub borrowing_enabled: bool,

    pub active: bool,
}

impl ReserveConfig {
    /// Active, borrowable reserve with a 5% borrow rate
    pub fn default(ltv_bps: u16, liquidation_threshold_bps: u16, decimals: u8) -> Self {
        Self {
            ltv_bps,
            liquidation_threshold_bps,
            decimals,
            borrow_rate: RAY / 20,
            borrowing_enabled: true,
            active: true,
        }
    }

    pub fn validate(&self) -> Result<(), ProgramError> {
        validate_risk_params(self.ltv_bps, self.liquidation_threshold_bps)?;
        if self.decimals > 30 {
            msg!("Invalid decimals: {}", self.decimals);
            return Err(LendingError::InvalidConfig.into());
        }
        Ok(())
    }
}

/// Risk parameters for an NFT collection
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct NftCollectionConfig {
    pub ltv_bps: u16,
    pub liquidation_threshold_bps: u16,
    /// Main staking pool for this collection; `None` if it cannot co-stake
    pub staking_pool: Option<PoolId>,
}

impl NftCollectionConfig {
    pub fn validate(&self) -> Result<(), ProgramError> {
        validate_risk_params(self.ltv_bps, self.liquidation_threshold_bps)
    }
}

/// Staking integration parameters
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct StakingConfig {
    /// Fungible asset staked against NFT collateral
    pub staked_asset: Pubkey,

    /// LTV of the staking derivative balance
    pub derivative_ltv_bps: u16,

    /// Liquidation threshold of the staking derivative balance
    pub derivative_liquidation_threshold_bps: u16,

    /// Collection whose tokens pair with main tokens
    pub companion_collection: Pubkey,

    /// Pool that holds paired stakes
    pub companion_pool: PoolId,

    /// Smallest amount a single stake operation may carry
    pub min_stake_amount: u128,
}

impl StakingConfig {
    /// Minimum stake of one whole token of the staked asset
    pub fn default(
        staked_asset: Pubkey,
        staked_decimals: u8,
        companion_collection: Pubkey,
        companion_pool: PoolId,
    ) -> Result<Self, ProgramError> {
        Ok(Self {
            staked_asset,
            derivative_ltv_bps: 2_000,
            derivative_liquidation_threshold_bps: 7_000,
            companion_collection,
            companion_pool,
            min_stake_amount: unit(staked_decimals)?,
        })
    }

    pub fn validate(&self) -> Result<(), ProgramError> {
        validate_risk_params(
            self.derivative_ltv_bps,
            self.derivative_liquidation_threshold_bps,
        )?;
        if self.min_stake_amount == 0 {
            msg!("Minimum stake must be positive");
            return Err(LendingError::InvalidConfig.into());
        }
        Ok(())
    }
}

/// Pool-wide configuration
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct PoolConfig {
    /// Bonus granted to NFT liquidators in basis points (10500 = 5% discount)
    pub liquidation_bonus_bps: u16,

    pub staking: StakingConfig,
}

impl PoolConfig {
    pub const DEFAULT_LIQUIDATION_BONUS_BPS: u16 = 10_500;

    pub fn default(staking: StakingConfig) -> Self {
        Self {
            liquidation_bonus_bps: Self::DEFAULT_LIQUIDATION_BONUS_BPS,
            staking,
        }
    }

    pub fn validate(&self) -> Result<(), ProgramError> {
        if (self.liquidation_bonus_bps as u128) < PERCENTAGE_FACTOR {
            msg!("Liquidation bonus below 100%: {}", self.liquidation_bonus_bps);
            return Err(LendingError::InvalidConfig.into());
        }
        self.staking.validate()
    }
}

fn validate_risk_params(ltv_bps: u16, liquidation_threshold_bps: u16) -> Result<(), ProgramError> {
    if liquidation_threshold_bps as u128 > PERCENTAGE_FACTOR
        || ltv_bps > liquidation_threshold_bps
    {
        msg!(
            "Invalid risk params: ltv={} threshold={}",
            ltv_bps,
            liquidation_threshold_bps
        );
        return Err(LendingError::InvalidConfig.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staking() -> StakingConfig {
        StakingConfig::default(Pubkey::new_unique(), 18, Pubkey::new_unique(), PoolId(3)).unwrap()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = PoolConfig::default(staking());
        assert!(config.validate().is_ok());
        assert_eq!(config.staking.min_stake_amount, 1_000_000_000_000_000_000);
    }

    #[test]
    fn test_rejects_bad_risk_params() {
        assert!(ReserveConfig::default(8_000, 7_500, 18).validate().is_err());
        assert!(ReserveConfig::default(2_000, 10_001, 18).validate().is_err());

        let mut config = PoolConfig::default(staking());
        config.liquidation_bonus_bps = 9_999;
        assert!(config.validate().is_err());

        let mut staking = staking();
        staking.min_stake_amount = 0;
        assert!(staking.validate().is_err());
    }
}
