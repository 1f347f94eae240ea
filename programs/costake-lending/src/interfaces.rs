//! Capabilities consumed from external systems
//!
//! The pool only calls into these and reads opaque results; it never hands
//! them references into its own ledgers.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{program_error::ProgramError, pubkey::Pubkey};

/// Identifier of a pool inside the external staking system
#[derive(
    BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct PoolId(pub u8);

/// A stake held in the external staking system on behalf of one NFT
#[derive(
    BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum StakePosition {
    /// Stake in a collection's main pool
    Main { pool: PoolId, token_id: u64 },
    /// Stake in the paired pool, keyed by main token and companion token
    Paired {
        main_pool: PoolId,
        main_token_id: u64,
        companion_token_id: u64,
    },
}

/// Base-currency price source
pub trait PriceOracle: Clone {
    /// Price of one whole unit of `asset` (or one token of an NFT collection)
    fn get_asset_price(&self, asset: &Pubkey) -> Result<u128, ProgramError>;
}

/// External staking system. The pool is always the recipient of unstaked
/// principal and claimed rewards.
pub trait StakingSystem: Clone {
    fn stake(&mut self, position: &StakePosition, amount: u128) -> Result<(), ProgramError>;

    /// Returns the amount released
    fn unstake(&mut self, position: &StakePosition, amount: u128) -> Result<u128, ProgramError>;

    /// Rewards claimable by `position` without unstaking
    fn pending_rewards(&self, position: &StakePosition) -> Result<u128, ProgramError>;

    /// Returns the rewards paid out
    fn claim(&mut self, position: &StakePosition) -> Result<u128, ProgramError>;
}

/// NFT custody with the token's own transfer authorization
pub trait NftRegistry: Clone {
    fn owner_of(&self, collection: &Pubkey, token_id: u64) -> Option<Pubkey>;

    /// Fails with `ProgramError::IllegalOwner` if `operator` may not move the
    /// token out of `from`, or `from` does not hold it
    fn transfer_from(
        &mut self,
        operator: &Pubkey,
        collection: &Pubkey,
        from: &Pubkey,
        to: &Pubkey,
        token_id: u64,
    ) -> Result<(), ProgramError>;
}
