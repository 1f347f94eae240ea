use solana_program::program_error::ProgramError;

use crate::error::LendingError;

use super::{mul_div, Rounding};

/// Wad precision (18 decimals); health factors are wads
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Ray precision (27 decimals); indices and rates are rays
pub const RAY: u128 = 1_000_000_000_000_000_000_000_000_000;

/// Basis points denominator
pub const PERCENTAGE_FACTOR: u128 = 10_000;

/// Health factor at which a position becomes liquidatable
pub const HEALTH_FACTOR_LIQUIDATION_THRESHOLD: u128 = WAD;

pub fn ray_mul(a: u128, b: u128, rounding: Rounding) -> Result<u128, ProgramError> {
    mul_div(a, b, RAY, rounding)
}

pub fn ray_div(a: u128, b: u128, rounding: Rounding) -> Result<u128, ProgramError> {
    if b == 0 {
        return Err(LendingError::MathOverflow.into());
    }
    mul_div(a, RAY, b, rounding)
}

/// `value * 10_000 / bps`
pub fn percent_div(value: u128, bps: u16, rounding: Rounding) -> Result<u128, ProgramError> {
    if bps == 0 {
        return Err(LendingError::MathOverflow.into());
    }
    mul_div(value, PERCENTAGE_FACTOR, bps as u128, rounding)
}

pub fn checked_add(a: u128, b: u128) -> Result<u128, ProgramError> {
    a.checked_add(b).ok_or_else(|| LendingError::MathOverflow.into())
}

pub fn checked_sub(a: u128, b: u128) -> Result<u128, ProgramError> {
    a.checked_sub(b).ok_or_else(|| LendingError::MathOverflow.into())
}

/// `10^decimals` as a u128
pub fn unit(decimals: u8) -> Result<u128, ProgramError> {
    10u128
        .checked_pow(decimals as u32)
        .ok_or_else(|| LendingError::MathOverflow.into())
}
