//! 256-bit intermediate arithmetic
//!
//! Ray products of two u128 values do not fit in u128, so every
//! multiply-then-divide goes through a full 256-bit product.

use solana_program::program_error::ProgramError;

use crate::error::LendingError;

use super::Rounding;

const LIMB_MASK: u128 = u64::MAX as u128;

/// 256-bit unsigned integer represented as two u128 values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct U256 {
    /// Low 128 bits
    pub lo: u128,
    /// High 128 bits
    pub hi: u128,
}

impl U256 {
    pub const ZERO: Self = Self { lo: 0, hi: 0 };

    pub const fn from_u128(val: u128) -> Self {
        Self { lo: val, hi: 0 }
    }

    /// Full product of two u128 values
    pub fn full_mul(a: u128, b: u128) -> Self {
        let (a_hi, a_lo) = (a >> 64, a & LIMB_MASK);
        let (b_hi, b_lo) = (b >> 64, b & LIMB_MASK);

        let ll = a_lo * b_lo;
        let lh = a_lo * b_hi;
        let hl = a_hi * b_lo;
        let hh = a_hi * b_hi;

        // at most 66 bits
        let mid = (ll >> 64) + (lh & LIMB_MASK) + (hl & LIMB_MASK);

        Self {
            lo: (ll & LIMB_MASK) | (mid << 64),
            hi: hh + (lh >> 64) + (hl >> 64) + (mid >> 64),
        }
    }

    /// Divide by a u128, returning (quotient, remainder).
    /// Fails when the quotient does not fit in u128.
    pub fn div_rem(&self, divisor: u128) -> Result<(u128, u128), ProgramError> {
        if divisor == 0 {
            return Err(LendingError::MathOverflow.into());
        }
        if self.hi == 0 {
            return Ok((self.lo / divisor, self.lo % divisor));
        }
        if self.hi >= divisor {
            return Err(LendingError::MathOverflow.into());
        }

        // Shift-subtract long division over the low word, remainder seeded with the high word.
        let mut rem = self.hi;
        let mut quot = 0u128;
        for bit in (0..128).rev() {
            let carry = rem >> 127;
            rem = (rem << 1) | ((self.lo >> bit) & 1);
            quot <<= 1;
            if carry == 1 || rem >= divisor {
                rem = rem.wrapping_sub(divisor);
                quot |= 1;
            }
        }

        Ok((quot, rem))
    }
}

/// `a * b / c` with the requested rounding and no intermediate overflow.
pub fn mul_div(a: u128, b: u128, c: u128, rounding: Rounding) -> Result<u128, ProgramError> {
    let (quot, rem) = U256::full_mul(a, b).div_rem(c)?;
    match rounding {
        Rounding::Down => Ok(quot),
        Rounding::Up if rem > 0 => quot
            .checked_add(1)
            .ok_or_else(|| LendingError::MathOverflow.into()),
        Rounding::Up => Ok(quot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_mul_matches_native_when_small() {
        let p = U256::full_mul(123_456_789, 987_654_321);
        assert_eq!(p, U256::from_u128(123_456_789u128 * 987_654_321u128));
    }

    #[test]
    fn test_full_mul_max() {
        // (2^128 - 1)^2 = 2^256 - 2^129 + 1
        let p = U256::full_mul(u128::MAX, u128::MAX);
        assert_eq!(p.lo, 1);
        assert_eq!(p.hi, u128::MAX - 1);
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        let ray = 10u128.pow(27);
        // 1e30 * 1e27 overflows u128 but the quotient does not
        let a = 10u128.pow(30);
        assert_eq!(mul_div(a, ray, ray, Rounding::Down).unwrap(), a);
        assert_eq!(mul_div(u128::MAX, u128::MAX, u128::MAX, Rounding::Down).unwrap(), u128::MAX);
    }

    #[test]
    fn test_mul_div_rounding() {
        assert_eq!(mul_div(10, 1, 3, Rounding::Down).unwrap(), 3);
        assert_eq!(mul_div(10, 1, 3, Rounding::Up).unwrap(), 4);
        assert_eq!(mul_div(9, 1, 3, Rounding::Up).unwrap(), 3);
    }

    #[test]
    fn test_mul_div_overflow_and_zero_divisor() {
        assert!(mul_div(u128::MAX, 2, 1, Rounding::Down).is_err());
        assert!(mul_div(1, 1, 0, Rounding::Down).is_err());
    }
}
