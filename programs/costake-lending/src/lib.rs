// Co-staking lending core
// Native Solana implementation - NO ANCHOR
//
// Index-scaled supply/debt ledgers (with rebasing underlyings), NFT collateral,
// and the staking lifecycle that borrows against that collateral.

pub mod access_control;
pub mod engine;
pub mod error;
pub mod instruction;
pub mod interfaces;
pub mod math;
pub mod mock;
pub mod processor;
pub mod state;

pub use engine::{LendingPool, UserAccountData};
pub use error::LendingError;

// Declare program ID
solana_program::declare_id!("CoStake111111111111111111111111111111111111");
