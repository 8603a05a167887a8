//! Type-specific transaction handlers.
//!
//! Each handler receives the driver after the account/fee/signature
//! pipeline has passed and expresses its effects purely through the
//! delta-set's bookkeeping operations.

pub mod add_referee;
pub mod add_wallet;
pub mod cancel_offer;
pub mod change;
pub mod create_offer;
pub mod dividend;
pub mod payment;
pub mod set_account;
pub mod set_regular_key;
pub mod set_trust;
pub mod tickets;
