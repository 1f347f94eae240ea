use num_derive::FromPrimitive;
use solana_program::{
    decode_error::DecodeError,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, FromPrimitive, PartialEq)]
pub enum LendingError {
    #[error("Caller does not own the referenced position")]
    NotOwner = 0,

    #[error("NFT is not supplied as collateral")]
    NotSupplied = 1,

    #[error("Borrow plus cash does not match the staking amount")]
    StakingAmountMismatch = 2,

    #[error("Stake amount below minimum")]
    BelowMinimumStake = 3,

    #[error("Insufficient balance")]
    InsufficientBalance = 4,

    #[error("Health factor is lower than the liquidation threshold")]
    HealthFactorBelowLiquidationThreshold = 5,

    #[error("Health factor is not below the liquidation threshold")]
    HealthFactorNotBelowThreshold = 6,

    #[error("Insufficient reserve liquidity")]
    InsufficientLiquidity = 7,

    #[error("Collateral cannot cover new borrow")]
    CollateralCannotCoverNewBorrow = 8,

    #[error("Math overflow")]
    MathOverflow = 9,

    #[error("Invalid configuration")]
    InvalidConfig = 10,

    #[error("Unauthorized")]
    Unauthorized = 11,

    #[error("Reserve not found")]
    ReserveNotFound = 12,

    #[error("Reserve already exists")]
    ReserveAlreadyExists = 13,

    #[error("Collection not listed")]
    CollectionNotListed = 14,

    #[error("Collection has no staking pool")]
    StakingNotSupported = 15,

    #[error("Companion token does not match the pairing")]
    InvalidCompanionPairing = 16,

    #[error("Invalid oracle price")]
    InvalidOraclePrice = 17,

    #[error("Liquidation amount not enough")]
    LiquidationAmountNotEnough = 18,

    #[error("Pool is paused")]
    PoolPaused = 19,

    #[error("Invalid amount")]
    InvalidAmount = 20,

    #[error("Borrowing is disabled for this reserve")]
    BorrowingDisabled = 21,

    #[error("Operation not supported for this reserve kind")]
    InvalidReserveKind = 22,

    #[error("NFT already supplied")]
    NftAlreadySupplied = 23,
}

impl PrintProgramError for LendingError {
    fn print<E>(&self) {
        use solana_program::msg;
        msg!("LendingError: {}", self);
    }
}

impl From<LendingError> for ProgramError {
    fn from(e: LendingError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for LendingError {
    fn type_of() -> &'static str {
        "LendingError"
    }
}

impl LendingError {
    /// Recover a `LendingError` from a `ProgramError::Custom` code.
    pub fn from_program_error(err: &ProgramError) -> Option<Self> {
        match err {
            ProgramError::Custom(code) => num_traits::FromPrimitive::from_u32(*code),
            _ => None,
        }
    }
}
