//! Transaction metadata.
//!
//! After a transaction succeeds, the delta-set is folded into a
//! deterministic record of every entry it touched: an `AffectedNodes` set
//! ordered by ascending index, where each node carries the field subsets
//! selected by the per-field metadata flags, plus the fee-share takers
//! credited along the way.
//!
//! Building the metadata also *threads* the transaction: every affected
//! threaded entry, and the owner account of every created or deleted
//! entry, gets its `PreviousTxnId`/`PreviousTxnLgrSeq` advanced to this
//! transaction, with the prior pair recorded in the metadata. Entries
//! materialized from the parent ledger purely for threading are collected
//! in a side buffer and folded back into the delta-set as modifications at
//! the end, so the main iteration only sees the keys it snapshotted.

use std::collections::BTreeMap;
use std::sync::Arc;

use freshet_common::{AccountId, Amount, Hash256, Ter, TerResult};
use freshet_ledger::{index, meta, Entry, FieldId, FieldValue, Owners};
use tracing::{error, trace};

use crate::entry_set::{EntryAction, EntrySet};

/// How a node was affected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTag {
    Created,
    Modified,
    Deleted,
}

impl NodeTag {
    fn wire(self) -> u8 {
        match self {
            NodeTag::Created => 1,
            NodeTag::Modified => 2,
            NodeTag::Deleted => 3,
        }
    }

    fn label(self) -> &'static str {
        match self {
            NodeTag::Created => "CreatedNode",
            NodeTag::Modified => "ModifiedNode",
            NodeTag::Deleted => "DeletedNode",
        }
    }
}

/// One affected-node record.
#[derive(Debug, Clone, Default)]
pub struct AffectedNode {
    tag: Option<NodeTag>,
    entry_type: u16,
    previous_txn: Option<(Hash256, u32)>,
    previous_fields: Vec<(FieldId, FieldValue)>,
    final_fields: Vec<(FieldId, FieldValue)>,
    new_fields: Vec<(FieldId, FieldValue)>,
}

impl AffectedNode {
    pub fn tag(&self) -> NodeTag {
        self.tag.unwrap_or(NodeTag::Modified)
    }

    pub fn entry_type(&self) -> u16 {
        self.entry_type
    }

    /// The transaction/ledger pair this entry pointed at before it was
    /// threaded to the current transaction.
    pub fn previous_txn(&self) -> Option<(Hash256, u32)> {
        self.previous_txn
    }

    pub fn previous_fields(&self) -> &[(FieldId, FieldValue)] {
        &self.previous_fields
    }

    pub fn final_fields(&self) -> &[(FieldId, FieldValue)] {
        &self.final_fields
    }

    pub fn new_fields(&self) -> &[(FieldId, FieldValue)] {
        &self.new_fields
    }

    fn as_json(&self, idx: &Hash256) -> serde_json::Value {
        let fields_json = |fields: &[(FieldId, FieldValue)]| {
            fields
                .iter()
                .map(|(id, value)| (id.name().to_string(), value.as_json()))
                .collect::<serde_json::Map<_, _>>()
        };

        let mut body = serde_json::Map::new();
        body.insert("LedgerIndex".into(), serde_json::json!(idx.to_hex()));
        body.insert("LedgerEntryType".into(), serde_json::json!(self.entry_type));
        if let Some((prev_id, prev_seq)) = self.previous_txn {
            body.insert("PreviousTxnID".into(), serde_json::json!(prev_id.to_hex()));
            body.insert("PreviousTxnLgrSeq".into(), serde_json::json!(prev_seq));
        }
        if !self.previous_fields.is_empty() {
            body.insert(
                "PreviousFields".into(),
                serde_json::Value::Object(fields_json(&self.previous_fields)),
            );
        }
        if !self.final_fields.is_empty() {
            body.insert(
                "FinalFields".into(),
                serde_json::Value::Object(fields_json(&self.final_fields)),
            );
        }
        if !self.new_fields.is_empty() {
            body.insert(
                "NewFields".into(),
                serde_json::Value::Object(fields_json(&self.new_fields)),
            );
        }

        let mut wrapper = serde_json::Map::new();
        wrapper.insert(self.tag().label().to_string(), serde_json::Value::Object(body));
        serde_json::Value::Object(wrapper)
    }

    fn write_to(&self, idx: &Hash256, out: &mut Vec<u8>) {
        out.extend_from_slice(idx.as_bytes());
        out.push(self.tag().wire());
        out.extend_from_slice(&self.entry_type.to_be_bytes());

        match self.previous_txn {
            Some((prev_id, prev_seq)) => {
                out.push(1);
                out.extend_from_slice(prev_id.as_bytes());
                out.extend_from_slice(&prev_seq.to_be_bytes());
            }
            None => out.push(0),
        }

        for subset in [&self.previous_fields, &self.final_fields, &self.new_fields] {
            out.extend_from_slice(&(subset.len() as u32).to_be_bytes());
            for (id, value) in subset.iter() {
                out.extend_from_slice(&id.code().to_be_bytes());
                value.write_to(out);
            }
        }
    }
}

/// A fee-share credit recorded for the transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeShareTaker {
    pub account: AccountId,
    pub amount: Amount,
}

/// The metadata accumulator of one transaction execution.
#[derive(Debug, Clone)]
pub struct MetaSet {
    tx_id: Hash256,
    ledger_seq: u32,
    nodes: BTreeMap<Hash256, AffectedNode>,
    fee_share_takers: Vec<FeeShareTaker>,
}

impl MetaSet {
    pub fn new(tx_id: Hash256, ledger_seq: u32) -> Self {
        Self {
            tx_id,
            ledger_seq,
            nodes: BTreeMap::new(),
            fee_share_takers: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.fee_share_takers.clear();
    }

    pub fn tx_id(&self) -> Hash256 {
        self.tx_id
    }

    pub fn ledger_seq(&self) -> u32 {
        self.ledger_seq
    }

    /// Affected nodes in ascending index order.
    pub fn nodes(&self) -> impl Iterator<Item = (&Hash256, &AffectedNode)> {
        self.nodes.iter()
    }

    pub fn node(&self, idx: &Hash256) -> Option<&AffectedNode> {
        self.nodes.get(idx)
    }

    pub fn fee_share_takers(&self) -> &[FeeShareTaker] {
        &self.fee_share_takers
    }

    /// Record (or retag) an affected node.
    fn set_affected(&mut self, idx: Hash256, tag: NodeTag, entry_type: u16) {
        let node = self.nodes.entry(idx).or_default();
        node.tag = Some(tag);
        node.entry_type = entry_type;
    }

    /// Record the prior transaction pair on a node, creating it as
    /// `Modified` when absent. Returns false when the node already carries
    /// a different pair.
    fn thread_node(
        &mut self,
        idx: Hash256,
        entry_type: u16,
        prev_id: Hash256,
        prev_seq: u32,
    ) -> bool {
        let node = self.nodes.entry(idx).or_default();
        if node.tag.is_none() {
            node.tag = Some(NodeTag::Modified);
            node.entry_type = entry_type;
        }
        match node.previous_txn {
            None => {
                node.previous_txn = Some((prev_id, prev_seq));
                true
            }
            Some(existing) => existing == (prev_id, prev_seq),
        }
    }

    /// Merge a fee-share credit: an existing taker with the same account
    /// and issue accumulates, otherwise a new record is appended.
    pub fn add_fee_share_taker(&mut self, account: AccountId, amount: Amount) {
        for taker in &mut self.fee_share_takers {
            if taker.account == account && taker.amount.issue() == amount.issue() {
                taker.amount = taker.amount.with_value(taker.amount.value() + amount.value());
                return;
            }
        }
        self.fee_share_takers.push(FeeShareTaker { account, amount });
    }

    /// Deterministic byte serialization of the full metadata set.
    pub fn to_bytes(&self, result: Ter, tx_index: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&result.code().to_be_bytes());
        out.extend_from_slice(&tx_index.to_be_bytes());

        out.extend_from_slice(&(self.nodes.len() as u32).to_be_bytes());
        for (idx, node) in &self.nodes {
            node.write_to(idx, &mut out);
        }

        out.extend_from_slice(&(self.fee_share_takers.len() as u32).to_be_bytes());
        for taker in &self.fee_share_takers {
            out.extend_from_slice(taker.account.as_bytes());
            out.extend_from_slice(&taker.amount.value().to_be_bytes());
            out.extend_from_slice(&taker.amount.currency().0);
            out.extend_from_slice(taker.amount.issuer().as_bytes());
        }

        out
    }

    /// JSON rendering for logs and the debug surface.
    pub fn as_json(&self) -> serde_json::Value {
        let nodes: Vec<serde_json::Value> = self
            .nodes
            .iter()
            .map(|(idx, node)| node.as_json(idx))
            .collect();
        let takers: Vec<serde_json::Value> = self
            .fee_share_takers
            .iter()
            .map(|taker| {
                serde_json::json!({
                    "Account": taker.account.to_hex(),
                    "Amount": taker.amount.to_string(),
                })
            })
            .collect();
        serde_json::json!({
            "TransactionID": self.tx_id.to_hex(),
            "LedgerSequence": self.ledger_seq,
            "AffectedNodes": nodes,
            "FeeShareTakers": takers,
        })
    }
}

impl EntrySet {
    /// Build the transaction metadata and serialize it with the result
    /// code and transaction index.
    ///
    /// Must be called after the handler finished and before the delta is
    /// merged: threading mutates affected entries and folds
    /// threading-materialized account roots back in as modifications.
    pub fn calc_raw_meta(&mut self, result: Ter, tx_index: u32) -> TerResult<Vec<u8>> {
        // Entries materialized from the parent ledger purely for
        // threading.
        let mut new_mods: BTreeMap<Hash256, Entry> = BTreeMap::new();

        // Snapshot the keys to walk: threading must not extend this
        // iteration.
        let touched: Vec<(Hash256, EntryAction)> = self
            .entries
            .iter()
            .filter(|(_, slot)| slot.action != EntryAction::Cached)
            .map(|(idx, slot)| (*idx, slot.action))
            .collect();

        for (idx, action) in touched {
            let orig = self.ledger.get_entry_shared(&idx);
            let cur = match self.entries.get(&idx) {
                Some(slot) => Arc::clone(&slot.entry),
                None => continue,
            };

            match action {
                EntryAction::Modified => {
                    let Some(orig) = orig else {
                        error!(index = %idx, "modified entry missing from parent ledger");
                        debug_assert!(false, "modified entry has no original");
                        continue;
                    };
                    if *orig == *cur {
                        // No-op modify: not part of the metadata.
                        continue;
                    }
                    let type_code = cur.entry_type().code();
                    self.meta.set_affected(idx, NodeTag::Modified, type_code);

                    if cur.entry_type().is_threaded() {
                        self.thread_stored(idx, type_code);
                    }
                    let cur = Arc::clone(&self.entries[&idx].entry);

                    let node = self.meta.nodes.entry(idx).or_default();
                    node.previous_fields = orig
                        .fields()
                        .filter(|(id, value)| {
                            id.meta() & meta::CHANGE_ORIG != 0 && !cur.has_matching(*id, value)
                        })
                        .map(|(id, value)| (id, value.clone()))
                        .collect();
                    node.final_fields = cur
                        .fields()
                        .filter(|(id, _)| id.meta() & (meta::ALWAYS | meta::CHANGE_NEW) != 0)
                        .map(|(id, value)| (id, value.clone()))
                        .collect();
                }

                EntryAction::Deleted => {
                    let Some(orig) = orig else {
                        error!(index = %idx, "deleted entry missing from parent ledger");
                        debug_assert!(false, "deleted entry has no original");
                        continue;
                    };
                    let type_code = cur.entry_type().code();
                    self.meta.set_affected(idx, NodeTag::Deleted, type_code);

                    self.thread_owners(&orig, &mut new_mods);

                    let node = self.meta.nodes.entry(idx).or_default();
                    node.previous_fields = orig
                        .fields()
                        .filter(|(id, value)| {
                            id.meta() & meta::CHANGE_ORIG != 0 && !cur.has_matching(*id, value)
                        })
                        .map(|(id, value)| (id, value.clone()))
                        .collect();
                    node.final_fields = cur
                        .fields()
                        .filter(|(id, _)| id.meta() & (meta::ALWAYS | meta::DELETE_FINAL) != 0)
                        .map(|(id, value)| (id, value.clone()))
                        .collect();
                }

                EntryAction::Created => {
                    debug_assert!(orig.is_none(), "created entry already in parent ledger");
                    let type_code = cur.entry_type().code();
                    self.meta.set_affected(idx, NodeTag::Created, type_code);

                    self.thread_owners(&cur, &mut new_mods);
                    if cur.entry_type().is_threaded() {
                        // Stamps the entry; a fresh entry has no prior
                        // pair, so nothing is recorded for it.
                        self.thread_stored(idx, type_code);
                    }
                    let cur = Arc::clone(&self.entries[&idx].entry);

                    let node = self.meta.nodes.entry(idx).or_default();
                    node.new_fields = cur
                        .fields()
                        .filter(|(id, value)| {
                            !value.is_default()
                                && id.meta() & (meta::CREATE | meta::ALWAYS) != 0
                        })
                        .map(|(id, value)| (id, value.clone()))
                        .collect();
                }

                EntryAction::Cached => unreachable!("cached entries were filtered out"),
            }
        }

        // Fold threading-materialized entries back into the delta.
        for (_, entry) in new_mods {
            self.entry_modify(&entry)?;
        }

        let bytes = self.meta.to_bytes(result, tx_index);
        trace!(meta = %self.meta.as_json(), "calc_raw_meta");
        Ok(bytes)
    }

    /// Thread the current transaction onto the entry stored at `idx`,
    /// recording the prior pair in the metadata when one exists.
    fn thread_stored(&mut self, idx: Hash256, type_code: u16) {
        let tx_id = self.meta.tx_id();
        let ledger_seq = self.meta.ledger_seq();

        let prev = match self.entries.get_mut(&idx) {
            Some(slot) => {
                let entry = Arc::make_mut(&mut slot.entry);
                slot.seq = self.seq;
                entry.thread(tx_id, ledger_seq)
            }
            None => None,
        };

        if let Some((prev_id, prev_seq)) = prev {
            if !prev_id.is_zero() {
                let recorded = self.meta.thread_node(idx, type_code, prev_id, prev_seq);
                debug_assert!(recorded, "conflicting thread record");
            }
        }
    }

    /// Thread the transaction to every owner of `entry`.
    fn thread_owners(&mut self, entry: &Entry, new_mods: &mut BTreeMap<Hash256, Entry>) {
        match entry.owners() {
            Owners::None => {}
            Owners::One(owner) => self.thread_to_account(owner, new_mods),
            Owners::Two(first, second) => {
                self.thread_to_account(first, new_mods);
                self.thread_to_account(second, new_mods);
            }
        }
    }

    /// Thread the transaction onto an account root, wherever it currently
    /// lives: the overlay, the side buffer, or the parent ledger.
    fn thread_to_account(&mut self, owner: AccountId, new_mods: &mut BTreeMap<Hash256, Entry>) {
        let target = index::account_index(owner);
        let tx_id = self.meta.tx_id();
        let ledger_seq = self.meta.ledger_seq();

        // Overlay first; never thread onto a deleted entry.
        if let Some(slot) = self.entries.get_mut(&target) {
            if slot.action == EntryAction::Deleted {
                error!(index = %target, "threading to deleted node");
                debug_assert!(false, "thread target is deleted");
                return;
            }
            if slot.action == EntryAction::Cached {
                slot.action = EntryAction::Modified;
            }
            let entry = Arc::make_mut(&mut slot.entry);
            slot.seq = self.seq;
            let type_code = entry.entry_type().code();
            let prev = entry.thread(tx_id, ledger_seq);
            if let Some((prev_id, prev_seq)) = prev {
                if !prev_id.is_zero() {
                    self.meta.thread_node(target, type_code, prev_id, prev_seq);
                }
            }
            return;
        }

        // Already materialized for an earlier thread?
        if let Some(entry) = new_mods.get_mut(&target) {
            let type_code = entry.entry_type().code();
            if let Some((prev_id, prev_seq)) = entry.thread(tx_id, ledger_seq) {
                if !prev_id.is_zero() {
                    self.meta.thread_node(target, type_code, prev_id, prev_seq);
                }
            }
            return;
        }

        // Ledger-only read.
        match self.ledger.get_entry(&target) {
            Some(mut entry) => {
                let type_code = entry.entry_type().code();
                if let Some((prev_id, prev_seq)) = entry.thread(tx_id, ledger_seq) {
                    if !prev_id.is_zero() {
                        self.meta.thread_node(target, type_code, prev_id, prev_seq);
                    }
                }
                new_mods.insert(target, entry);
            }
            None => {
                error!(%owner, "threading to non-existent account");
                debug_assert!(false, "thread target account missing");
            }
        }
    }
}
