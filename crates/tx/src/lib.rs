//! Transaction execution for the freshet ledger engine.
//!
//! The centerpiece is [`EntrySet`], the staged delta a single transaction
//! accumulates against a parent-ledger snapshot: a copy-on-write overlay
//! with a strict per-entry state machine, plus the bookkeeping protocols
//! handlers build on:
//!
//! - paged directory maintenance ([`directory`]);
//! - trust-line create/delete ([`trust`]) and balance queries ([`holds`]);
//! - the value-movement protocol with transit fees and referee fee
//!   sharing ([`transfer`], [`fee_share`]);
//! - offer removal ([`offer`]);
//! - deterministic transaction metadata with owner threading ([`meta`]).
//!
//! [`Transactor`] is the thin driver in front: frame checks, sequence,
//! fee, signing authority, then dispatch to the per-type handlers in
//! [`operations`]. [`TransactionEngine`] wires one transaction end to
//! end: fresh delta, driver, metadata, commit-or-discard.

pub mod directory;
pub mod engine;
pub mod entry_set;
pub mod fee_share;
pub mod frame;
pub mod holds;
pub mod meta;
pub mod offer;
pub mod operations;
pub mod transactor;
pub mod transfer;
pub mod trust;

pub use directory::{DirCursor, DIR_NODE_MAX};
pub use engine::{ApplyResult, TransactionEngine};
pub use entry_set::{EntryAction, EntrySet, TxParams};
pub use frame::{DividendKind, PubKey, SigState, Transaction, TxData, TxType};
pub use holds::FreezeHandling;
pub use meta::{AffectedNode, FeeShareTaker, MetaSet, NodeTag};
pub use transactor::Transactor;
