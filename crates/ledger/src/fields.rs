//! Entry fields: identifiers, typed values, and metadata flags.
//!
//! Ledger entries are field maps rather than fixed structs: the metadata
//! builder walks an entry's fields generically, deciding per field whether
//! it belongs in the `PreviousFields`, `FinalFields`, or `NewFields` subset
//! of an affected-node record. That decision is driven by the flags in
//! [`FieldId::meta`].

use freshet_common::{AccountId, Amount, Hash256};

/// Metadata-selection flags. A field's flags declare which affected-node
/// subsets it may appear in.
pub mod meta {
    /// Record the original value in `PreviousFields` when it changed.
    pub const CHANGE_ORIG: u8 = 0x01;
    /// Record the current value in `FinalFields` on modification.
    pub const CHANGE_NEW: u8 = 0x02;
    /// Record the final value in `FinalFields` on deletion.
    pub const DELETE_FINAL: u8 = 0x04;
    /// Record the value in `NewFields` on creation (when non-default).
    pub const CREATE: u8 = 0x08;
    /// Record the current value in every subset that is emitted.
    pub const ALWAYS: u8 = 0x10;
    /// The flags carried by an ordinary value field.
    pub const DEFAULT: u8 = CHANGE_ORIG | CHANGE_NEW | DELETE_FINAL | CREATE;
}

/// Field identifier.
///
/// The discriminant doubles as the wire code; the high byte encodes the
/// value kind, so sorting by code groups fields by type. Declaration order
/// matches code order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum FieldId {
    // 8-bit.
    DividendState = 0x0101,

    // 32-bit.
    Flags = 0x0201,
    Sequence = 0x0202,
    OwnerCount = 0x0203,
    TransferRate = 0x0204,
    PreviousTxnLgrSeq = 0x0205,
    LowQualityIn = 0x0206,
    LowQualityOut = 0x0207,
    HighQualityIn = 0x0208,
    HighQualityOut = 0x0209,
    DividendLedger = 0x020a,
    ReserveBase = 0x020b,
    ReserveIncrement = 0x020c,
    Expiration = 0x020d,

    // 64-bit.
    IndexNext = 0x0301,
    IndexPrevious = 0x0302,
    LowNode = 0x0303,
    HighNode = 0x0304,
    OwnerNode = 0x0305,
    BookNode = 0x0306,
    DividendVSprd = 0x0307,
    BaseFee = 0x0308,
    DividendCoins = 0x0309,

    // 256-bit.
    RootIndex = 0x0501,
    BookDirectory = 0x0502,
    PreviousTxnId = 0x0503,
    AccountTxnId = 0x0504,

    // Amounts.
    Balance = 0x0601,
    BalanceVBC = 0x0602,
    LowLimit = 0x0603,
    HighLimit = 0x0604,
    TakerPays = 0x0605,
    TakerGets = 0x0606,

    // Index vectors.
    Indexes = 0x0701,
    Amendments = 0x0702,

    // Accounts.
    Account = 0x0801,
    Owner = 0x0802,
    RegularKey = 0x0803,
    Referee = 0x0804,
    Target = 0x0805,
}

impl FieldId {
    /// Wire code.
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Metadata-selection flags for this field.
    pub fn meta(&self) -> u8 {
        match self {
            // Threading fields are only interesting on deletion; their
            // modification history is carried by the affected-node record
            // itself.
            FieldId::PreviousTxnId | FieldId::PreviousTxnLgrSeq => meta::DELETE_FINAL,
            _ => meta::DEFAULT,
        }
    }

    /// Human name, used in the JSON debug view.
    pub fn name(&self) -> &'static str {
        match self {
            FieldId::DividendState => "DividendState",
            FieldId::Flags => "Flags",
            FieldId::Sequence => "Sequence",
            FieldId::OwnerCount => "OwnerCount",
            FieldId::TransferRate => "TransferRate",
            FieldId::PreviousTxnLgrSeq => "PreviousTxnLgrSeq",
            FieldId::LowQualityIn => "LowQualityIn",
            FieldId::LowQualityOut => "LowQualityOut",
            FieldId::HighQualityIn => "HighQualityIn",
            FieldId::HighQualityOut => "HighQualityOut",
            FieldId::DividendLedger => "DividendLedger",
            FieldId::ReserveBase => "ReserveBase",
            FieldId::ReserveIncrement => "ReserveIncrement",
            FieldId::Expiration => "Expiration",
            FieldId::IndexNext => "IndexNext",
            FieldId::IndexPrevious => "IndexPrevious",
            FieldId::LowNode => "LowNode",
            FieldId::HighNode => "HighNode",
            FieldId::OwnerNode => "OwnerNode",
            FieldId::BookNode => "BookNode",
            FieldId::DividendVSprd => "DividendVSprd",
            FieldId::BaseFee => "BaseFee",
            FieldId::DividendCoins => "DividendCoins",
            FieldId::RootIndex => "RootIndex",
            FieldId::BookDirectory => "BookDirectory",
            FieldId::PreviousTxnId => "PreviousTxnId",
            FieldId::AccountTxnId => "AccountTxnId",
            FieldId::Balance => "Balance",
            FieldId::BalanceVBC => "BalanceVBC",
            FieldId::LowLimit => "LowLimit",
            FieldId::HighLimit => "HighLimit",
            FieldId::TakerPays => "TakerPays",
            FieldId::TakerGets => "TakerGets",
            FieldId::Indexes => "Indexes",
            FieldId::Amendments => "Amendments",
            FieldId::Account => "Account",
            FieldId::Owner => "Owner",
            FieldId::RegularKey => "RegularKey",
            FieldId::Referee => "Referee",
            FieldId::Target => "Target",
        }
    }
}

/// Value kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U8,
    U32,
    U64,
    Hash,
    Amount,
    Vector,
    Account,
}

/// A typed field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    U8(u8),
    U32(u32),
    U64(u64),
    Hash(Hash256),
    Amount(Amount),
    Vector(Vec<Hash256>),
    Account(AccountId),
}

impl FieldValue {
    /// The kind of this value.
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::U8(_) => FieldKind::U8,
            FieldValue::U32(_) => FieldKind::U32,
            FieldValue::U64(_) => FieldKind::U64,
            FieldValue::Hash(_) => FieldKind::Hash,
            FieldValue::Amount(_) => FieldKind::Amount,
            FieldValue::Vector(_) => FieldKind::Vector,
            FieldValue::Account(_) => FieldKind::Account,
        }
    }

    /// Whether the value is at its default. Default-valued fields are
    /// omitted from `NewFields` records.
    pub fn is_default(&self) -> bool {
        match self {
            FieldValue::U8(v) => *v == 0,
            FieldValue::U32(v) => *v == 0,
            FieldValue::U64(v) => *v == 0,
            FieldValue::Hash(h) => h.is_zero(),
            // A zero amount still carries information when it names an
            // issue (a trust limit of zero, say); only the fully blank
            // amount is default.
            FieldValue::Amount(a) => {
                a.is_zero() && a.currency().is_xrp() && a.issuer().is_zero()
            }
            FieldValue::Vector(v) => v.is_empty(),
            FieldValue::Account(a) => a.is_zero(),
        }
    }

    /// Append the deterministic byte encoding of this value.
    ///
    /// The encoding is length-stable per kind: a one-byte kind tag followed
    /// by fixed-width big-endian payloads (vectors carry a length prefix).
    pub fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            FieldValue::U8(v) => {
                out.push(0x01);
                out.push(*v);
            }
            FieldValue::U32(v) => {
                out.push(0x02);
                out.extend_from_slice(&v.to_be_bytes());
            }
            FieldValue::U64(v) => {
                out.push(0x03);
                out.extend_from_slice(&v.to_be_bytes());
            }
            FieldValue::Hash(h) => {
                out.push(0x05);
                out.extend_from_slice(h.as_bytes());
            }
            FieldValue::Amount(a) => {
                out.push(0x06);
                out.extend_from_slice(&a.value().to_be_bytes());
                out.extend_from_slice(&a.currency().0);
                out.extend_from_slice(a.issuer().as_bytes());
            }
            FieldValue::Vector(v) => {
                out.push(0x07);
                out.extend_from_slice(&(v.len() as u32).to_be_bytes());
                for h in v {
                    out.extend_from_slice(h.as_bytes());
                }
            }
            FieldValue::Account(a) => {
                out.push(0x08);
                out.extend_from_slice(a.as_bytes());
            }
        }
    }

    /// JSON rendering for the debug surface.
    pub fn as_json(&self) -> serde_json::Value {
        match self {
            FieldValue::U8(v) => serde_json::json!(v),
            FieldValue::U32(v) => serde_json::json!(v),
            FieldValue::U64(v) => serde_json::json!(v),
            FieldValue::Hash(h) => serde_json::json!(h.to_hex()),
            FieldValue::Amount(a) => serde_json::json!({
                "value": a.value().to_string(),
                "currency": a.currency().to_string(),
                "issuer": a.issuer().to_hex(),
            }),
            FieldValue::Vector(v) => {
                serde_json::json!(v.iter().map(|h| h.to_hex()).collect::<Vec<_>>())
            }
            FieldValue::Account(a) => serde_json::json!(a.to_hex()),
        }
    }
}
