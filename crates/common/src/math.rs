//! 128-bit intermediate arithmetic for fee and rate calculations.

use std::num::TryFromIntError;
use thiserror::Error;

/// Rounding mode for division operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Round toward zero (truncate).
    Down,
    /// Round away from zero (ceiling for positive results).
    Up,
}

/// Error type for math operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MathError {
    #[error("overflow while performing big divide")]
    Overflow,
    #[error("division by zero")]
    DivisionByZero,
    #[error("negative input where non-negative required")]
    NegativeInput,
}

impl From<TryFromIntError> for MathError {
    fn from(_: TryFromIntError) -> Self {
        MathError::Overflow
    }
}

/// Calculates `a * b / c` when `a * b` might overflow 64 bits.
///
/// Uses 128-bit intermediate arithmetic to avoid overflow during the
/// multiplication step. Inputs must be non-negative and the divisor
/// strictly positive.
pub fn big_divide(a: i64, b: i64, c: i64, rounding: Rounding) -> Result<i64, MathError> {
    if a < 0 || b < 0 {
        return Err(MathError::NegativeInput);
    }
    if c <= 0 {
        return Err(MathError::DivisionByZero);
    }

    let product = (a as i128) * (b as i128);
    let divisor = c as i128;
    let result = match rounding {
        Rounding::Down => product / divisor,
        Rounding::Up => (product + divisor - 1) / divisor,
    };

    i64::try_from(result).map_err(|_| MathError::Overflow)
}
