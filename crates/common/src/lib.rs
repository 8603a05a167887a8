//! Shared types for the freshet ledger engine.
//!
//! This crate holds the vocabulary the rest of the workspace is written in:
//! content-derived indexes and account ids ([`Hash256`], [`AccountId`]),
//! currency/issue/amount types ([`Currency`], [`Issue`], [`Amount`]), the
//! closed transaction-result taxonomy ([`Ter`]), 128-bit helper arithmetic,
//! and protocol constants.

pub mod amount;
pub mod math;
pub mod protocol;
pub mod result;
pub mod types;

pub use amount::{Amount, Currency, Issue};
pub use result::{Ter, TerCategory, TerResult};
pub use types::{sha512_half, AccountId, Hash256};
