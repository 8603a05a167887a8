//! Typed ledger entries.
//!
//! An [`Entry`] is a content-addressed record: a type tag, the 256-bit
//! index it lives at, and a sorted field map. Typed accessors follow the
//! convention that reading an absent scalar field yields the kind's zero
//! value; optional presence is observable through [`Entry::has_field`].

use std::collections::BTreeMap;

use freshet_common::{AccountId, Amount, Hash256};

use crate::fields::{FieldId, FieldValue};

/// Ledger entry type tag. The code is the 16-bit value recorded for each
/// affected node in transaction metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum EntryType {
    AccountRoot = 0x0061,
    DividendObject = 0x0044,
    DirNode = 0x0064,
    Amendments = 0x0066,
    GeneratorMap = 0x0067,
    Nickname = 0x006e,
    Offer = 0x006f,
    RippleState = 0x0072,
    FeeSettings = 0x0073,
    Ticket = 0x0054,
}

impl EntryType {
    /// The 16-bit wire code.
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Whether entries of this type are *threaded*: they carry
    /// `PreviousTxnId`/`PreviousTxnLgrSeq` and record, per entry, the last
    /// transaction that touched them.
    pub fn is_threaded(&self) -> bool {
        matches!(
            self,
            EntryType::AccountRoot
                | EntryType::RippleState
                | EntryType::Offer
                | EntryType::Ticket
                | EntryType::Nickname
        )
    }

    /// Name used by the JSON debug view.
    pub fn name(&self) -> &'static str {
        match self {
            EntryType::AccountRoot => "account_root",
            EntryType::DividendObject => "dividend_object",
            EntryType::DirNode => "dir_node",
            EntryType::Amendments => "amendments",
            EntryType::GeneratorMap => "generator_map",
            EntryType::Nickname => "nickname",
            EntryType::Offer => "offer",
            EntryType::RippleState => "ripple_state",
            EntryType::FeeSettings => "fee_settings",
            EntryType::Ticket => "ticket",
        }
    }
}

/// Account-root flag bits (stored in [`FieldId::Flags`]).
pub mod account_flags {
    pub const PASSWORD_SPENT: u32 = 0x0001_0000;
    pub const REQUIRE_DEST_TAG: u32 = 0x0002_0000;
    pub const REQUIRE_AUTH: u32 = 0x0004_0000;
    pub const DISALLOW_XRP: u32 = 0x0008_0000;
    pub const DISABLE_MASTER: u32 = 0x0010_0000;
    pub const NO_FREEZE: u32 = 0x0020_0000;
    pub const GLOBAL_FREEZE: u32 = 0x0040_0000;
}

/// Trust-line flag bits. `LOW_*` flags describe the numerically smaller
/// endpoint's side of the line, `HIGH_*` the larger.
pub mod line_flags {
    pub const LOW_RESERVE: u32 = 0x0001_0000;
    pub const HIGH_RESERVE: u32 = 0x0002_0000;
    pub const LOW_AUTH: u32 = 0x0004_0000;
    pub const HIGH_AUTH: u32 = 0x0008_0000;
    pub const LOW_NO_RIPPLE: u32 = 0x0010_0000;
    pub const HIGH_NO_RIPPLE: u32 = 0x0020_0000;
    pub const LOW_FREEZE: u32 = 0x0040_0000;
    pub const HIGH_FREEZE: u32 = 0x0080_0000;

    /// Pick the side-sensitive flag for an endpoint.
    pub fn sided(high_side: bool, low: u32, high: u32) -> u32 {
        if high_side {
            high
        } else {
            low
        }
    }
}

/// Offer flag bits.
pub mod offer_flags {
    pub const PASSIVE: u32 = 0x0001_0000;
    pub const SELL: u32 = 0x0002_0000;
}

/// Dividend lifecycle states recorded on the dividend object.
pub mod dividend_state {
    pub const START: u8 = 0;
    pub const COLLECTING: u8 = 1;
    pub const DONE: u8 = 2;
}

/// Owner references of an entry, used when threading transactions to the
/// accounts an affected node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owners {
    None,
    One(AccountId),
    Two(AccountId, AccountId),
}

/// A typed, content-addressed ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    entry_type: EntryType,
    index: Hash256,
    fields: BTreeMap<FieldId, FieldValue>,
}

impl Entry {
    /// Create an empty entry of the given type at the given index.
    pub fn new(entry_type: EntryType, index: Hash256) -> Self {
        Self {
            entry_type,
            index,
            fields: BTreeMap::new(),
        }
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    pub fn index(&self) -> Hash256 {
        self.index
    }

    /// Whether the field is present.
    pub fn has_field(&self, id: FieldId) -> bool {
        self.fields.contains_key(&id)
    }

    /// Remove a field if present.
    pub fn clear_field(&mut self, id: FieldId) {
        self.fields.remove(&id);
    }

    /// Raw field access.
    pub fn field(&self, id: FieldId) -> Option<&FieldValue> {
        self.fields.get(&id)
    }

    /// Iterate fields in code order.
    pub fn fields(&self) -> impl Iterator<Item = (FieldId, &FieldValue)> {
        self.fields.iter().map(|(id, value)| (*id, value))
    }

    /// Whether `self` carries `id` with exactly the given value.
    pub fn has_matching(&self, id: FieldId, value: &FieldValue) -> bool {
        self.fields.get(&id) == Some(value)
    }

    fn set(&mut self, id: FieldId, value: FieldValue) {
        self.fields.insert(id, value);
    }

    pub fn field_u8(&self, id: FieldId) -> u8 {
        match self.fields.get(&id) {
            Some(FieldValue::U8(v)) => *v,
            Some(other) => {
                debug_assert!(false, "field {id:?} holds {:?}, wanted u8", other.kind());
                0
            }
            None => 0,
        }
    }

    pub fn field_u32(&self, id: FieldId) -> u32 {
        match self.fields.get(&id) {
            Some(FieldValue::U32(v)) => *v,
            Some(other) => {
                debug_assert!(false, "field {id:?} holds {:?}, wanted u32", other.kind());
                0
            }
            None => 0,
        }
    }

    pub fn field_u64(&self, id: FieldId) -> u64 {
        match self.fields.get(&id) {
            Some(FieldValue::U64(v)) => *v,
            Some(other) => {
                debug_assert!(false, "field {id:?} holds {:?}, wanted u64", other.kind());
                0
            }
            None => 0,
        }
    }

    pub fn field_hash(&self, id: FieldId) -> Hash256 {
        match self.fields.get(&id) {
            Some(FieldValue::Hash(h)) => *h,
            Some(other) => {
                debug_assert!(false, "field {id:?} holds {:?}, wanted hash", other.kind());
                Hash256::ZERO
            }
            None => Hash256::ZERO,
        }
    }

    pub fn field_account(&self, id: FieldId) -> AccountId {
        match self.fields.get(&id) {
            Some(FieldValue::Account(a)) => *a,
            Some(other) => {
                debug_assert!(false, "field {id:?} holds {:?}, wanted account", other.kind());
                AccountId::ZERO
            }
            None => AccountId::ZERO,
        }
    }

    pub fn field_amount(&self, id: FieldId) -> Option<Amount> {
        match self.fields.get(&id) {
            Some(FieldValue::Amount(a)) => Some(*a),
            Some(other) => {
                debug_assert!(false, "field {id:?} holds {:?}, wanted amount", other.kind());
                None
            }
            None => None,
        }
    }

    pub fn field_vector(&self, id: FieldId) -> Vec<Hash256> {
        match self.fields.get(&id) {
            Some(FieldValue::Vector(v)) => v.clone(),
            Some(other) => {
                debug_assert!(false, "field {id:?} holds {:?}, wanted vector", other.kind());
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    pub fn set_field_u8(&mut self, id: FieldId, value: u8) {
        self.set(id, FieldValue::U8(value));
    }

    pub fn set_field_u32(&mut self, id: FieldId, value: u32) {
        self.set(id, FieldValue::U32(value));
    }

    pub fn set_field_u64(&mut self, id: FieldId, value: u64) {
        self.set(id, FieldValue::U64(value));
    }

    pub fn set_field_hash(&mut self, id: FieldId, value: Hash256) {
        self.set(id, FieldValue::Hash(value));
    }

    pub fn set_field_account(&mut self, id: FieldId, value: AccountId) {
        self.set(id, FieldValue::Account(value));
    }

    pub fn set_field_amount(&mut self, id: FieldId, value: Amount) {
        self.set(id, FieldValue::Amount(value));
    }

    pub fn set_field_vector(&mut self, id: FieldId, value: Vec<Hash256>) {
        self.set(id, FieldValue::Vector(value));
    }

    // Flag helpers over the `Flags` field.

    pub fn flags(&self) -> u32 {
        self.field_u32(FieldId::Flags)
    }

    pub fn is_flag(&self, mask: u32) -> bool {
        self.flags() & mask != 0
    }

    pub fn set_flag(&mut self, mask: u32) {
        let flags = self.flags();
        self.set_field_u32(FieldId::Flags, flags | mask);
    }

    pub fn clear_flag(&mut self, mask: u32) {
        let flags = self.flags();
        self.set_field_u32(FieldId::Flags, flags & !mask);
    }

    /// Thread a transaction onto this entry.
    ///
    /// Records `tx_id`/`ledger_seq` as the entry's last-touching
    /// transaction and returns the previous pair. Returns `None` when the
    /// entry is already threaded to `tx_id` (re-threading within one
    /// transaction is a no-op).
    pub fn thread(&mut self, tx_id: Hash256, ledger_seq: u32) -> Option<(Hash256, u32)> {
        let prev_id = self.field_hash(FieldId::PreviousTxnId);
        if prev_id == tx_id {
            return None;
        }
        let prev_seq = self.field_u32(FieldId::PreviousTxnLgrSeq);
        self.set_field_hash(FieldId::PreviousTxnId, tx_id);
        self.set_field_u32(FieldId::PreviousTxnLgrSeq, ledger_seq);
        Some((prev_id, prev_seq))
    }

    /// The accounts that own this entry (and get the transaction threaded
    /// into their account roots when it is created or deleted).
    ///
    /// A trust line is owned by both endpoints; the endpoint ids are the
    /// issuers recorded on the side limits. Single-owner types carry their
    /// owner in the `Account` field.
    pub fn owners(&self) -> Owners {
        match self.entry_type {
            EntryType::RippleState => {
                let low = self
                    .field_amount(FieldId::LowLimit)
                    .map(|a| a.issuer())
                    .unwrap_or(AccountId::ZERO);
                let high = self
                    .field_amount(FieldId::HighLimit)
                    .map(|a| a.issuer())
                    .unwrap_or(AccountId::ZERO);
                Owners::Two(low, high)
            }
            EntryType::Offer | EntryType::Ticket | EntryType::Nickname => {
                let owner = self.field_account(FieldId::Account);
                if owner.is_zero() {
                    Owners::None
                } else {
                    Owners::One(owner)
                }
            }
            _ => Owners::None,
        }
    }

    /// JSON rendering of the full field map, for the debug surface.
    pub fn as_json(&self) -> serde_json::Value {
        let fields: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(id, value)| (id.name().to_string(), value.as_json()))
            .collect();
        serde_json::json!({
            "type": self.entry_type.name(),
            "index": self.index.to_hex(),
            "fields": fields,
        })
    }
}
