use solana_program::{
    entrypoint::ProgramResult, msg, program_error::PrintProgramError, pubkey::Pubkey,
};

use crate::{
    engine::LendingPool,
    error::LendingError,
    instruction::LendingInstruction,
    interfaces::{NftRegistry, PriceOracle, StakingSystem},
};

pub struct Processor;

impl Processor {
    /// Decode `instruction_data` and apply it to `pool` on behalf of `caller`
    pub fn process<O, S, N>(
        pool: &mut LendingPool<O, S, N>,
        caller: &Pubkey,
        instruction_data: &[u8],
    ) -> ProgramResult
    where
        O: PriceOracle,
        S: StakingSystem,
        N: NftRegistry,
    {
        let instruction = LendingInstruction::unpack(instruction_data)?;

        let result = match instruction {
            LendingInstruction::InitReserve { asset, config, kind } => {
                msg!("Instruction: InitReserve");
                pool.init_reserve(caller, asset, config, kind)
            }
            LendingInstruction::ConfigureReserve {
                asset,
                ltv_bps,
                liquidation_threshold_bps,
            } => {
                msg!("Instruction: ConfigureReserve");
                pool.configure_reserve(caller, &asset, ltv_bps, liquidation_threshold_bps)
            }
            LendingInstruction::ListCollection { collection, config } => {
                msg!("Instruction: ListCollection");
                pool.list_collection(caller, collection, config)
            }
            LendingInstruction::SetPaused { paused } => {
                msg!("Instruction: SetPaused");
                pool.set_paused(caller, paused)
            }
            LendingInstruction::GrantRole { role, account } => {
                msg!("Instruction: GrantRole");
                pool.grant_role(caller, role, account)
            }
            LendingInstruction::RevokeRole { role, account } => {
                msg!("Instruction: RevokeRole");
                pool.revoke_role(caller, role, &account)
            }
            LendingInstruction::Supply {
                asset,
                amount,
                on_behalf_of,
            } => {
                msg!("Instruction: Supply");
                pool.supply(caller, &asset, amount, &on_behalf_of)
            }
            LendingInstruction::Withdraw { asset, amount } => {
                msg!("Instruction: Withdraw");
                pool.withdraw(caller, &asset, amount).map(|_| ())
            }
            LendingInstruction::Borrow { asset, amount } => {
                msg!("Instruction: Borrow");
                pool.borrow(caller, &asset, amount)
            }
            LendingInstruction::Repay {
                asset,
                amount,
                on_behalf_of,
            } => {
                msg!("Instruction: Repay");
                pool.repay(caller, &asset, amount, &on_behalf_of).map(|_| ())
            }
            LendingInstruction::TransferSupply { asset, to, amount } => {
                msg!("Instruction: TransferSupply");
                pool.transfer_supply(caller, &asset, &to, amount)
            }
            LendingInstruction::SetUseReserveAsCollateral { asset, enabled } => {
                msg!("Instruction: SetUseReserveAsCollateral");
                pool.set_use_reserve_as_collateral(caller, &asset, enabled)
            }
            LendingInstruction::SupplyNft {
                collection,
                token_id,
                use_as_collateral,
            } => {
                msg!("Instruction: SupplyNft");
                pool.supply_nft(caller, &collection, token_id, use_as_collateral)
            }
            LendingInstruction::WithdrawNft { collection, token_id } => {
                msg!("Instruction: WithdrawNft");
                pool.withdraw_nft(caller, &collection, token_id)
            }
            LendingInstruction::SetNftCollateral {
                collection,
                token_id,
                enabled,
            } => {
                msg!("Instruction: SetNftCollateral");
                pool.set_nft_collateral(caller, &collection, token_id, enabled)
            }
            LendingInstruction::TransferNft {
                collection,
                token_id,
                to,
            } => {
                msg!("Instruction: TransferNft");
                pool.transfer_nft_collateral(caller, &collection, token_id, &to)
            }
            LendingInstruction::StakeAndBorrow {
                collection,
                funding,
                main_ops,
                companion_ops,
            } => {
                msg!("Instruction: StakeAndBorrow");
                pool.stake_and_borrow(caller, &collection, funding, &main_ops, &companion_ops)
            }
            LendingInstruction::WithdrawMainStake { collection, ops } => {
                msg!("Instruction: WithdrawMainStake");
                pool.withdraw_main_stake(caller, &collection, &ops).map(|_| ())
            }
            LendingInstruction::WithdrawCompanionStake { collection, ops } => {
                msg!("Instruction: WithdrawCompanionStake");
                pool.withdraw_companion_stake(caller, &collection, &ops)
                    .map(|_| ())
            }
            LendingInstruction::ClaimCompanionRewards { collection, claims } => {
                msg!("Instruction: ClaimCompanionRewards");
                pool.claim_companion_rewards(caller, &collection, &claims)
                    .map(|_| ())
            }
            LendingInstruction::ClaimMainRewards {
                collection,
                token_ids,
            } => {
                msg!("Instruction: ClaimMainRewards");
                pool.claim_main_rewards(caller, &collection, &token_ids)
                    .map(|_| ())
            }
            LendingInstruction::UnstakeAndRepay { collection, token_id } => {
                msg!("Instruction: UnstakeAndRepay");
                pool.unstake_and_repay(caller, &collection, token_id)
                    .map(|_| ())
            }
            LendingInstruction::LiquidateNft {
                collection,
                borrower,
                token_id,
                liquidation_asset,
                max_payment,
            } => {
                msg!("Instruction: LiquidateNft");
                pool.liquidate_nft(
                    caller,
                    &collection,
                    &borrower,
                    token_id,
                    &liquidation_asset,
                    max_payment,
                )
                .map(|_| ())
            }
        };

        if let Err(error) = &result {
            error.print::<LendingError>();
        }
        result
    }
}
