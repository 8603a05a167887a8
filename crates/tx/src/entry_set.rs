//! The staged delta-set.
//!
//! An [`EntrySet`] buffers every read, creation, modification, and deletion
//! a single transaction performs against a parent-ledger snapshot. Each
//! buffered entry carries an action tag; the tags move through a strict
//! state machine and the final tag decides how the entry is reported in
//! metadata and merged at commit time:
//!
//! | call           | absent    | Cached   | Created       | Modified | Deleted            |
//! |----------------|-----------|----------|---------------|----------|--------------------|
//! | `entry_cache`  | Cached    | refresh  | error         | error    | reads as absent    |
//! | `entry_create` | Created   | error    | error         | error    | Modified (resurrect) |
//! | `entry_modify` | Modified  | Modified | stays Created | stays    | error              |
//! | `entry_delete` | error     | Deleted  | erased        | Deleted  | no-op              |
//!
//! Entries are stamped with the set's generation counter. [`EntrySet::duplicate`]
//! bumps the generation and shares entry storage; the first access to a
//! stale entry in either set clones it (copy-on-read), so a set and its
//! duplicate never observe each other's writes.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use freshet_common::{AccountId, Hash256, Ter, TerResult};
use freshet_ledger::{index, Entry, EntryType, FieldId, Ledger};
use tracing::{debug, error};

use crate::meta::MetaSet;

/// Execution parameters for a transaction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxParams {
    /// Applying against an open (proposing) ledger rather than a closed one.
    /// Shortfalls report `tel` codes instead of `tec` so the transaction is
    /// not persisted.
    pub open_ledger: bool,
    /// Administrative submission: bypasses fee load escalation.
    pub admin: bool,
    /// Skip signature verification (already verified upstream).
    pub no_check_sign: bool,
}

/// Action tag of a buffered entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAction {
    /// Read through from the parent ledger, unmodified so far.
    Cached,
    /// Did not exist in the parent ledger; created by this transaction.
    Created,
    /// Exists in the parent ledger and has been changed.
    Modified,
    /// Marked for deletion at commit.
    Deleted,
}

/// A buffered entry with its action tag and generation stamp.
#[derive(Debug, Clone)]
pub(crate) struct SetEntry {
    pub(crate) entry: Arc<Entry>,
    pub(crate) action: EntryAction,
    pub(crate) seq: u32,
}

/// The copy-on-write overlay a transaction executes in.
#[derive(Debug, Clone)]
pub struct EntrySet {
    pub(crate) ledger: Arc<Ledger>,
    pub(crate) entries: BTreeMap<Hash256, SetEntry>,
    pub(crate) meta: MetaSet,
    pub(crate) params: TxParams,
    pub(crate) immutable: bool,
    pub(crate) seq: u32,
}

impl EntrySet {
    /// Create a fresh delta-set rooted at a parent snapshot.
    pub fn new(ledger: Arc<Ledger>, tx_id: Hash256, ledger_seq: u32, params: TxParams) -> Self {
        Self {
            ledger,
            entries: BTreeMap::new(),
            meta: MetaSet::new(tx_id, ledger_seq),
            params,
            immutable: false,
            seq: 0,
        }
    }

    /// Re-initialize in place for a new transaction.
    pub fn init(&mut self, ledger: Arc<Ledger>, tx_id: Hash256, ledger_seq: u32, params: TxParams) {
        self.entries.clear();
        self.ledger = ledger;
        self.meta = MetaSet::new(tx_id, ledger_seq);
        self.params = params;
        self.seq = 0;
    }

    /// Drop all buffered entries and metadata.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.meta.clear();
    }

    /// The parent snapshot.
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// The execution parameters.
    pub fn params(&self) -> TxParams {
        self.params
    }

    /// The metadata accumulator.
    pub fn meta(&self) -> &MetaSet {
        &self.meta
    }

    /// Whether the set is read-only.
    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// Mark the set read-only: further reads go through the shared
    /// (immutable) snapshot handles and mutating calls become illegal.
    /// Used by query paths that reuse the bookkeeping helpers.
    pub fn set_immutable(&mut self, immutable: bool) {
        self.immutable = immutable;
    }

    /// Logically-independent copy for speculative sub-execution.
    ///
    /// Entry storage is shared; the bumped generation makes either side
    /// clone a shared entry on its next access.
    pub fn duplicate(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            entries: self.entries.clone(),
            meta: self.meta.clone(),
            params: self.params,
            immutable: self.immutable,
            seq: self.seq + 1,
        }
    }

    /// Exchange the contents of two delta-sets.
    pub fn swap_with(&mut self, other: &mut EntrySet) {
        std::mem::swap(self, other);
    }

    /// The action currently recorded for an index, if any.
    pub fn entry_action(&self, idx: &Hash256) -> Option<EntryAction> {
        self.entries.get(idx).map(|e| e.action)
    }

    /// Whether the set holds any record for the index.
    pub fn has_entry(&self, idx: &Hash256) -> bool {
        self.entries.contains_key(idx)
    }

    /// Fetch the buffered value and action for an index, re-stamping a
    /// stale entry (copy-on-read) first.
    pub fn get_entry(&mut self, idx: &Hash256) -> Option<(Entry, EntryAction)> {
        let set_seq = self.seq;
        let slot = self.entries.get_mut(idx)?;
        if slot.seq != set_seq {
            debug_assert!(slot.seq < set_seq);
            slot.entry = Arc::new(Entry::clone(&slot.entry));
            slot.seq = set_seq;
        }
        Some((Entry::clone(&slot.entry), slot.action))
    }

    /// Read an entry through the overlay.
    ///
    /// Misses populate the overlay from the parent ledger as `Cached`;
    /// entries already marked `Deleted` read as absent.
    pub fn entry_cache(&mut self, typ: EntryType, idx: Hash256) -> TerResult<Option<Entry>> {
        if idx.is_zero() {
            return Ok(None);
        }

        if let Some((entry, action)) = self.get_entry(&idx) {
            if action == EntryAction::Deleted {
                return Ok(None);
            }
            if entry.entry_type() != typ {
                // The index resolves to something else entirely (a
                // caller-supplied id can point anywhere): report a miss.
                debug!(index = %idx, expected = ?typ, found = ?entry.entry_type(),
                    "entry_cache type mismatch");
                return Ok(None);
            }
            return Ok(Some(entry));
        }

        let fetched = if self.immutable {
            self.ledger.get_entry_shared(&idx).map(|e| Entry::clone(&e))
        } else {
            self.ledger.get_entry(&idx)
        };

        match fetched {
            Some(entry) => {
                if entry.entry_type() != typ {
                    debug!(index = %idx, expected = ?typ, found = ?entry.entry_type(),
                        "entry_cache type mismatch");
                    return Ok(None);
                }
                self.entries.insert(
                    idx,
                    SetEntry {
                        entry: Arc::new(entry.clone()),
                        action: EntryAction::Cached,
                        seq: self.seq,
                    },
                );
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// Stage creation of a new entry and return it for filling in.
    ///
    /// Creating over a `Deleted` entry resurrects it as `Modified`; creating
    /// over anything else is handler misuse.
    pub fn entry_create(&mut self, typ: EntryType, idx: Hash256) -> TerResult<Entry> {
        debug_assert!(!idx.is_zero());
        debug_assert!(!self.immutable);

        let entry = Entry::new(typ, idx);
        match self.entries.get_mut(&idx) {
            None => {
                self.entries.insert(
                    idx,
                    SetEntry {
                        entry: Arc::new(entry.clone()),
                        action: EntryAction::Created,
                        seq: self.seq,
                    },
                );
                Ok(entry)
            }
            Some(slot) => match slot.action {
                EntryAction::Deleted => {
                    debug!(index = %idx, "create after delete treated as modify");
                    slot.entry = Arc::new(entry.clone());
                    slot.action = EntryAction::Modified;
                    slot.seq = self.seq;
                    Ok(entry)
                }
                action => {
                    error!(index = %idx, ?action, "entry_create over live entry");
                    debug_assert!(false, "create after cache/create/modify");
                    Err(Ter::TefInternal)
                }
            },
        }
    }

    /// Write an entry's current value back into the set, marking it
    /// modified. A `Created` entry stays `Created`.
    pub fn entry_modify(&mut self, entry: &Entry) -> TerResult<()> {
        debug_assert!(!self.immutable);
        let idx = entry.index();

        match self.entries.get_mut(&idx) {
            None => {
                self.entries.insert(
                    idx,
                    SetEntry {
                        entry: Arc::new(entry.clone()),
                        action: EntryAction::Modified,
                        seq: self.seq,
                    },
                );
                Ok(())
            }
            Some(slot) => match slot.action {
                EntryAction::Cached | EntryAction::Modified => {
                    slot.entry = Arc::new(entry.clone());
                    slot.action = EntryAction::Modified;
                    slot.seq = self.seq;
                    Ok(())
                }
                EntryAction::Created => {
                    slot.entry = Arc::new(entry.clone());
                    slot.seq = self.seq;
                    Ok(())
                }
                EntryAction::Deleted => {
                    error!(index = %idx, "entry_modify after delete");
                    debug_assert!(false, "modify after delete");
                    Err(Ter::TefInternal)
                }
            },
        }
    }

    /// Stage deletion of an entry.
    ///
    /// Deleting a `Created` entry erases it outright (net no-op); deleting
    /// an already-deleted entry is idempotent.
    pub fn entry_delete(&mut self, entry: &Entry) -> TerResult<()> {
        debug_assert!(!self.immutable);
        let idx = entry.index();

        match self.entries.get_mut(&idx) {
            None => {
                // Deleting an entry that was never cached is handler
                // misuse; record the deletion anyway so commit stays
                // consistent with the caller's intent.
                error!(index = %idx, "entry_delete of untracked entry");
                debug_assert!(false, "deleting an entry that was never cached");
                self.entries.insert(
                    idx,
                    SetEntry {
                        entry: Arc::new(entry.clone()),
                        action: EntryAction::Deleted,
                        seq: self.seq,
                    },
                );
                Ok(())
            }
            Some(slot) => match slot.action {
                EntryAction::Cached | EntryAction::Modified => {
                    slot.entry = Arc::new(entry.clone());
                    slot.action = EntryAction::Deleted;
                    slot.seq = self.seq;
                    Ok(())
                }
                EntryAction::Created => {
                    self.entries.remove(&idx);
                    Ok(())
                }
                EntryAction::Deleted => Ok(()),
            },
        }
    }

    /// The smallest index strictly greater than `after`, considering both
    /// the parent ledger and this overlay, and skipping entries the overlay
    /// has deleted.
    pub fn next_index(&self, after: Hash256) -> Option<Hash256> {
        // Next surviving node in the parent ledger.
        let mut ledger_next = Some(after);
        loop {
            ledger_next = self.ledger.next_index(match ledger_next {
                Some(idx) => idx,
                None => break,
            });
            match ledger_next {
                Some(idx) => match self.entries.get(&idx) {
                    Some(slot) if slot.action == EntryAction::Deleted => continue,
                    _ => break,
                },
                None => break,
            }
        }

        // Next surviving node staged in the overlay; return the earlier of
        // the two.
        for (idx, slot) in self
            .entries
            .range((Bound::Excluded(after), Bound::Unbounded))
        {
            if slot.action != EntryAction::Deleted {
                return match ledger_next {
                    Some(ln) if ln < *idx => Some(ln),
                    _ => Some(*idx),
                };
            }
        }

        ledger_next
    }

    /// Like [`EntrySet::next_index`], bounded above by `end` (inclusive).
    pub fn next_index_bounded(&self, after: Hash256, end: Hash256) -> Option<Hash256> {
        self.next_index(after).filter(|idx| *idx <= end)
    }

    /// Bump an account's owned-entry count.
    pub fn increment_owner_count(&mut self, owner: AccountId) -> TerResult<()> {
        let Some(mut root) =
            self.entry_cache(EntryType::AccountRoot, index::account_index(owner))?
        else {
            error!(%owner, "increment_owner_count: no account root");
            debug_assert!(false, "owner account missing");
            return Err(Ter::TefInternal);
        };

        let count = root.field_u32(FieldId::OwnerCount);
        if count == u32::MAX {
            error!(%owner, "owner count exceeds max");
            return Ok(());
        }
        root.set_field_u32(FieldId::OwnerCount, count + 1);
        self.entry_modify(&root)
    }

    /// Drop an account's owned-entry count.
    pub fn decrement_owner_count(&mut self, owner: AccountId) -> TerResult<()> {
        let Some(mut root) =
            self.entry_cache(EntryType::AccountRoot, index::account_index(owner))?
        else {
            error!(%owner, "decrement_owner_count: no account root");
            debug_assert!(false, "owner account missing");
            return Err(Ter::TefInternal);
        };

        let count = root.field_u32(FieldId::OwnerCount);
        if count == 0 {
            error!(%owner, "owner count is already 0");
            return Ok(());
        }
        root.set_field_u32(FieldId::OwnerCount, count - 1);
        self.entry_modify(&root)
    }

    /// The staged changes, for merging into the parent ledger: `Some`
    /// upserts, `None` deletes. `Cached` reads are not part of the delta.
    pub fn changes(&self) -> Vec<(Hash256, Option<Arc<Entry>>)> {
        self.entries
            .iter()
            .filter_map(|(idx, slot)| match slot.action {
                EntryAction::Cached => None,
                EntryAction::Created | EntryAction::Modified => {
                    Some((*idx, Some(Arc::clone(&slot.entry))))
                }
                EntryAction::Deleted => Some((*idx, None)),
            })
            .collect()
    }

    /// Debug view: every buffered entry with its action, plus the metadata
    /// accumulated so far.
    pub fn entries_json(&self) -> serde_json::Value {
        let nodes: Vec<serde_json::Value> = self
            .entries
            .iter()
            .map(|(idx, slot)| {
                serde_json::json!({
                    "node": idx.to_hex(),
                    "type": slot.entry.entry_type().name(),
                    "action": match slot.action {
                        EntryAction::Cached => "cache",
                        EntryAction::Created => "create",
                        EntryAction::Modified => "modify",
                        EntryAction::Deleted => "delete",
                    },
                })
            })
            .collect();
        serde_json::json!({
            "nodes": nodes,
            "metaData": self.meta.as_json(),
        })
    }
}
