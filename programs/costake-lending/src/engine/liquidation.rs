use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    error::LendingError,
    interfaces::{NftRegistry, PriceOracle, StakingSystem},
    math::{checked_sub, mul_div, percent_div, unit, Rounding},
};

use super::{LendingPool, UnwindOutcome};

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LiquidationOutcome {
    /// Set when the NFT carried stakes that had to be released first
    pub unwind: Option<UnwindOutcome>,
    /// Amount of the liquidation asset taken from the liquidator
    pub payment: u128,
    pub debt_repaid: u128,
    /// Excess payment supplied as the borrower's collateral
    pub collateral_supplied: u128,
}

impl<O, S, N> LendingPool<O, S, N>
where
    O: PriceOracle,
    S: StakingSystem,
    N: NftRegistry,
{
    /// Amount of `asset` a liquidator pays for one NFT of `collection`:
    /// the floor price converted into `asset`, discounted by the bonus
    pub fn nft_liquidation_price(
        &self,
        collection: &Pubkey,
        asset: &Pubkey,
    ) -> Result<u128, ProgramError> {
        let floor = self.asset_price(collection)?;
        let decimals = self.reserve(asset)?.config.decimals;
        let amount = mul_div(floor, unit(decimals)?, self.asset_price(asset)?, Rounding::Up)?;
        percent_div(amount, self.config.liquidation_bonus_bps, Rounding::Up)
    }

    /// Buy an unsafe borrower's NFT collateral. Stakes on the token are
    /// unwound for the borrower before the sale is priced.
    pub fn liquidate_nft(
        &mut self,
        liquidator: &Pubkey,
        collection: &Pubkey,
        borrower: &Pubkey,
        token_id: u64,
        liquidation_asset: &Pubkey,
        max_payment: u128,
    ) -> Result<LiquidationOutcome, ProgramError> {
        self.atomic(|pool| {
            pool.ensure_active()?;
            pool.owned_collateral_position(borrower, collection, token_id)?;
            let staked = pool.needs_unwind(collection, token_id)?;
            pool.ensure_liquidatable(borrower)?;

            let mut outcome = LiquidationOutcome::default();
            if staked {
                outcome.unwind = Some(pool.unwind_position(borrower, collection, token_id)?);
            }

            outcome.payment = pool.nft_liquidation_price(collection, liquidation_asset)?;
            if max_payment < outcome.payment {
                msg!(
                    "Liquidation needs {} but only {} offered",
                    outcome.payment,
                    max_payment
                );
                return Err(LendingError::LiquidationAmountNotEnough.into());
            }

            pool.wallets
                .debit(liquidation_asset, liquidator, outcome.payment)?;
            outcome.debt_repaid =
                pool.repay_internal(liquidation_asset, borrower, outcome.payment)?;
            let remainder = checked_sub(outcome.payment, outcome.debt_repaid)?;
            outcome.collateral_supplied =
                pool.settle_to_collateral(liquidation_asset, borrower, remainder)?;

            pool.positions.remove(&(*collection, token_id));
            let custody = pool.address;
            pool.nfts
                .transfer_from(&custody, collection, &custody, liquidator, token_id)?;

            msg!(
                "Liquidated {} #{} of {}: paid {}, repaid {}",
                collection,
                token_id,
                borrower,
                outcome.payment,
                outcome.debt_repaid
            );
            Ok(outcome)
        })
    }
}
