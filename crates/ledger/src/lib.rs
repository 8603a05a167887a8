//! Ledger entries, index derivation, and the parent-ledger snapshot.
//!
//! This crate models ledger state as typed, content-addressed records:
//!
//! - [`Entry`]: a field map with per-field metadata flags, the unit the
//!   mutation engine stages and the metadata builder diffs;
//! - [`index`]: the protocol-fixed derivations from identifying fields to
//!   256-bit indexes;
//! - [`Ledger`]: the immutable snapshot a transaction executes against,
//!   with the reserve/fee/freeze parameters and the single commit hook.

pub mod entry;
pub mod fields;
pub mod index;
pub mod snapshot;

pub use entry::{
    account_flags, dividend_state, line_flags, offer_flags, Entry, EntryType, Owners,
};
pub use fields::{meta, FieldId, FieldKind, FieldValue};
pub use snapshot::{owner_dir_describer, FeeSchedule, Ledger};
