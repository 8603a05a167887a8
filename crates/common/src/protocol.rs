//! Protocol-fixed constants.

/// The transfer-rate representation of 1.0: a rate of `QUALITY_ONE` charges
/// no transit fee; `1_020_000_000` charges 2%.
pub const QUALITY_ONE: u32 = 1_000_000_000;

/// Minimum dividend spread an ancestor must have accumulated in the current
/// dividend round to qualify for a transit-fee share.
pub const MIN_VSPD_TO_GET_FEE_SHARE: u64 = 10_000_000_000;

/// Maximum number of ancestors walked when sharing transit fees.
pub const MAX_REFEREE_HEIGHT: usize = 5;

/// Numerator/denominator of the transit-fee fraction routed to ancestors
/// (25%), which is then split evenly across [`MAX_REFEREE_HEIGHT`] shares.
pub const FEE_SHARE_RATE: (i64, i64) = (25, 100);
