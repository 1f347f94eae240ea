use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::{
    access_control::Role,
    engine::{CompanionClaim, CompanionStakeOp, MainStakeOp, StakeFunding},
    state::{NftCollectionConfig, ReserveConfig, ReserveKind},
};

/// Instructions accepted by the lending pool. The caller is supplied
/// alongside the data and acts as signer for every variant.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub enum LendingInstruction {
    /// List a fungible reserve
    /// Caller: `PoolAdmin`
    InitReserve {
        asset: Pubkey,
        config: ReserveConfig,
        kind: ReserveKind,
    },

    /// Update reserve risk parameters
    /// Caller: `RiskAdmin`
    ConfigureReserve {
        asset: Pubkey,
        ltv_bps: u16,
        liquidation_threshold_bps: u16,
    },

    /// List an NFT collection as collateral
    /// Caller: `PoolAdmin`
    ListCollection {
        collection: Pubkey,
        config: NftCollectionConfig,
    },

    /// Caller: `EmergencyAdmin`
    SetPaused { paused: bool },

    /// Caller: `PoolAdmin`
    GrantRole { role: Role, account: Pubkey },

    /// Caller: `PoolAdmin`
    RevokeRole { role: Role, account: Pubkey },

    Supply {
        asset: Pubkey,
        amount: u128,
        on_behalf_of: Pubkey,
    },

    /// `u128::MAX` withdraws the full balance
    Withdraw { asset: Pubkey, amount: u128 },

    Borrow { asset: Pubkey, amount: u128 },

    /// `u128::MAX` repays the full debt
    Repay {
        asset: Pubkey,
        amount: u128,
        on_behalf_of: Pubkey,
    },

    TransferSupply {
        asset: Pubkey,
        to: Pubkey,
        amount: u128,
    },

    SetUseReserveAsCollateral { asset: Pubkey, enabled: bool },

    SupplyNft {
        collection: Pubkey,
        token_id: u64,
        use_as_collateral: bool,
    },

    WithdrawNft { collection: Pubkey, token_id: u64 },

    SetNftCollateral {
        collection: Pubkey,
        token_id: u64,
        enabled: bool,
    },

    TransferNft {
        collection: Pubkey,
        token_id: u64,
        to: Pubkey,
    },

    /// Stake against supplied NFTs; op amounts must total borrow + cash
    StakeAndBorrow {
        collection: Pubkey,
        funding: StakeFunding,
        main_ops: Vec<MainStakeOp>,
        companion_ops: Vec<CompanionStakeOp>,
    },

    WithdrawMainStake {
        collection: Pubkey,
        ops: Vec<MainStakeOp>,
    },

    WithdrawCompanionStake {
        collection: Pubkey,
        ops: Vec<CompanionStakeOp>,
    },

    ClaimCompanionRewards {
        collection: Pubkey,
        claims: Vec<CompanionClaim>,
    },

    ClaimMainRewards {
        collection: Pubkey,
        token_ids: Vec<u64>,
    },

    /// Owner at any time; anyone while the owner's health factor is below one
    UnstakeAndRepay { collection: Pubkey, token_id: u64 },

    LiquidateNft {
        collection: Pubkey,
        borrower: Pubkey,
        token_id: u64,
        liquidation_asset: Pubkey,
        max_payment: u128,
    },
}

impl LendingInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(input).map_err(|_| ProgramError::InvalidInstructionData)
    }

    pub fn pack(&self) -> Result<Vec<u8>, ProgramError> {
        self.try_to_vec()
            .map_err(|_| ProgramError::InvalidInstructionData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpack_rejects_garbage() {
        assert_eq!(
            LendingInstruction::unpack(&[0xff, 1, 2]).unwrap_err(),
            ProgramError::InvalidInstructionData
        );
        assert_eq!(
            LendingInstruction::unpack(&[]).unwrap_err(),
            ProgramError::InvalidInstructionData
        );
    }

    #[test]
    fn test_stake_instruction_layout() {
        let instruction = LendingInstruction::StakeAndBorrow {
            collection: Pubkey::new_unique(),
            funding: StakeFunding {
                borrow_amount: 5,
                cash_amount: 10,
            },
            main_ops: vec![MainStakeOp {
                token_id: 1,
                amount: 15,
            }],
            companion_ops: vec![],
        };
        let data = instruction.pack().unwrap();
        // variant 16
        assert_eq!(data[0], 16);
        assert_eq!(LendingInstruction::unpack(&data).unwrap(), instruction);
    }
}
