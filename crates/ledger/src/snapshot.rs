//! The parent-ledger snapshot.
//!
//! A [`Ledger`] is the read surface a transaction executes against: an
//! ordered, content-addressed entry store plus the ledger-level parameters
//! (sequence, reserves, fee scaling, freeze enforcement) and the set of
//! transaction ids already included. During a transaction the snapshot is
//! immutable; the staged delta is merged back through [`Ledger::commit`]
//! once the caller decides the transaction stands.

use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use std::sync::Arc;

use freshet_common::{AccountId, Hash256};
use tracing::debug;

use crate::entry::{Entry, EntryType};
use crate::fields::FieldId;
use crate::index;

/// Fee and reserve parameters of a ledger.
#[derive(Debug, Clone, Copy)]
pub struct FeeSchedule {
    /// Reserve an account must hold with zero owned entries, in drops.
    pub reserve_base: u64,
    /// Additional reserve per owned entry, in drops.
    pub reserve_increment: u64,
    /// Reference transaction fee, in drops.
    pub base_fee: u64,
    /// Current load multiplier, in units of `load_base`.
    pub load_factor: u32,
    /// The load-factor denominator.
    pub load_base: u32,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            reserve_base: 200_000_000,
            reserve_increment: 50_000_000,
            base_fee: 10,
            load_factor: 256,
            load_base: 256,
        }
    }
}

/// A closed-ledger snapshot.
#[derive(Debug, Clone)]
pub struct Ledger {
    sequence: u32,
    entries: BTreeMap<Hash256, Arc<Entry>>,
    transactions: HashSet<Hash256>,
    fees: FeeSchedule,
    enforce_freeze: bool,
}

impl Ledger {
    /// Create an empty snapshot at the given ledger sequence.
    pub fn new(sequence: u32) -> Self {
        Self {
            sequence,
            entries: BTreeMap::new(),
            transactions: HashSet::new(),
            fees: FeeSchedule::default(),
            enforce_freeze: true,
        }
    }

    /// The ledger sequence number.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// The fee and reserve parameters.
    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    pub fn set_fees(&mut self, fees: FeeSchedule) {
        self.fees = fees;
    }

    /// Whether trust-line freezing is enforced on this ledger.
    pub fn enforce_freeze(&self) -> bool {
        self.enforce_freeze
    }

    pub fn set_enforce_freeze(&mut self, enforce: bool) {
        self.enforce_freeze = enforce;
    }

    /// Fetch an entry as an owned, mutable copy.
    pub fn get_entry(&self, idx: &Hash256) -> Option<Entry> {
        self.entries.get(idx).map(|e| Entry::clone(e))
    }

    /// Fetch an entry as a shared immutable handle.
    pub fn get_entry_shared(&self, idx: &Hash256) -> Option<Arc<Entry>> {
        self.entries.get(idx).cloned()
    }

    /// Whether an entry exists at the index.
    pub fn contains(&self, idx: &Hash256) -> bool {
        self.entries.contains_key(idx)
    }

    /// The smallest entry index strictly greater than `after`, if any.
    pub fn next_index(&self, after: Hash256) -> Option<Hash256> {
        self.entries
            .range((Bound::Excluded(after), Bound::Unbounded))
            .next()
            .map(|(idx, _)| *idx)
    }

    /// The account root for `account`, if the account exists.
    pub fn account_root(&self, account: AccountId) -> Option<Entry> {
        self.get_entry(&index::account_index(account))
    }

    /// The dividend-object singleton, if present.
    pub fn dividend_object(&self) -> Option<Entry> {
        self.get_entry(&index::dividend_index())
    }

    /// The reserve, in drops, required of an account owning `owner_count`
    /// directory-tracked entries.
    pub fn reserve(&self, owner_count: u32) -> u64 {
        self.fees.reserve_base + self.fees.reserve_increment * owner_count as u64
    }

    /// Scale a base fee by the current server load. Administrative
    /// transactions bypass load escalation.
    pub fn scale_fee_load(&self, base_fee: u64, admin: bool) -> u64 {
        if admin || self.fees.load_base == 0 {
            return base_fee;
        }
        base_fee * self.fees.load_factor as u64 / self.fees.load_base as u64
    }

    /// Whether a transaction id is already included in this ledger line.
    pub fn has_transaction(&self, tx_id: &Hash256) -> bool {
        self.transactions.contains(tx_id)
    }

    /// Record an included transaction id.
    pub fn record_transaction(&mut self, tx_id: Hash256) {
        self.transactions.insert(tx_id);
    }

    /// Insert or replace an entry.
    pub fn insert_entry(&mut self, entry: Entry) {
        self.entries.insert(entry.index(), Arc::new(entry));
    }

    /// Remove an entry.
    pub fn remove_entry(&mut self, idx: &Hash256) {
        self.entries.remove(idx);
    }

    /// Number of entries in the snapshot.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge a staged delta: `Some(entry)` upserts, `None` deletes.
    ///
    /// This is the single commit hook the mutation engine uses; everything
    /// else on this type is read-only during transaction execution.
    pub fn commit<I>(&mut self, changes: I)
    where
        I: IntoIterator<Item = (Hash256, Option<Arc<Entry>>)>,
    {
        let mut upserts = 0usize;
        let mut deletes = 0usize;
        for (idx, change) in changes {
            match change {
                Some(entry) => {
                    self.entries.insert(idx, entry);
                    upserts += 1;
                }
                None => {
                    self.entries.remove(&idx);
                    deletes += 1;
                }
            }
        }
        debug!(sequence = self.sequence, upserts, deletes, "committed delta");
    }
}

/// Stamp ownership metadata onto a freshly created owner-directory page.
///
/// Passed as the describer callback when adding to an owner directory, so
/// the directory engine never needs to know what kind of directory it is
/// growing.
pub fn owner_dir_describer(page: &mut Entry, _is_root: bool, owner: AccountId) {
    debug_assert_eq!(page.entry_type(), EntryType::DirNode);
    page.set_field_account(FieldId::Owner, owner);
}
