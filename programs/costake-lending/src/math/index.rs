use solana_program::program_error::ProgramError;

use super::{checked_add, mul_div, ray_div, ray_mul, Rounding, RAY};

pub const SECONDS_PER_YEAR: u128 = 365 * 24 * 60 * 60;

/// Convert a real amount into index-scaled units
pub fn scale(real: u128, index: u128, rounding: Rounding) -> Result<u128, ProgramError> {
    ray_div(real, index, rounding)
}

/// Convert index-scaled units back into a real amount
pub fn unscale(scaled: u128, index: u128, rounding: Rounding) -> Result<u128, ProgramError> {
    ray_mul(scaled, index, rounding)
}

/// Growth factor (ray) of a linearly accruing annual rate over `elapsed` seconds
pub fn linear_interest(rate: u128, elapsed: u64) -> Result<u128, ProgramError> {
    let accrued = mul_div(rate, elapsed as u128, SECONDS_PER_YEAR, Rounding::Down)?;
    checked_add(RAY, accrued)
}

/// Move an index forward. A smaller index than the current one is an
/// invariant break in the ledger and aborts.
pub fn advance_index(current: u128, next: u128) -> u128 {
    assert!(
        next >= current,
        "index regression: {} -> {}",
        current,
        next
    );
    next
}
