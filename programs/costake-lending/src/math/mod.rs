pub mod index;
pub mod ray;
pub mod wide;

pub use index::*;
pub use ray::*;
pub use wide::mul_div;

use borsh::{BorshDeserialize, BorshSerialize};

/// Direction applied to the truncated remainder of a fixed-point operation
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Toward zero
    Down,
    /// Away from zero
    Up,
}
