//! Shared fixtures for the end-to-end suites.
#![allow(dead_code)]

use std::sync::Arc;

use freshet_common::{AccountId, Amount, Currency, Hash256, Issue};
use freshet_ledger::{index, Entry, EntryType, FieldId, Ledger};
use freshet_tx::{EntrySet, TxParams};

pub fn account(seed: u8) -> AccountId {
    AccountId::from_bytes([seed; 20])
}

pub fn usd(issuer: AccountId) -> Issue {
    Issue::new(Currency::from_code("USD"), issuer)
}

pub fn tx_id(seed: u8) -> Hash256 {
    Hash256::from_bytes([seed; 32])
}

/// An account root with a funded XRP balance.
pub fn funded_root(seed: u8, balance: i64) -> Entry {
    let id = account(seed);
    let mut root = Entry::new(EntryType::AccountRoot, index::account_index(id));
    root.set_field_account(FieldId::Account, id);
    root.set_field_amount(FieldId::Balance, Amount::drops(balance));
    root.set_field_u32(FieldId::Sequence, 1);
    root
}

/// A ledger holding funded roots for each seed.
pub fn funded_ledger(sequence: u32, seeds: &[u8]) -> Ledger {
    let mut ledger = Ledger::new(sequence);
    for &seed in seeds {
        ledger.insert_entry(funded_root(seed, 10_000_000_000));
    }
    ledger
}

/// A trust line between `holder` and `issuer`, `balance` in the holder's
/// terms.
pub fn trust_line(holder: AccountId, issuer: AccountId, balance: i64) -> Entry {
    let currency = Currency::from_code("USD");
    let idx = index::line_index(holder, issuer, currency);
    let (low, high) = if holder < issuer {
        (holder, issuer)
    } else {
        (issuer, holder)
    };
    let stored = if holder > issuer { -balance } else { balance };
    let mut line = Entry::new(EntryType::RippleState, idx);
    line.set_field_amount(
        FieldId::Balance,
        Amount::new(stored, Issue::new(currency, AccountId::ZERO)),
    );
    line.set_field_amount(
        FieldId::LowLimit,
        Amount::new(1_000_000, Issue::new(currency, low)),
    );
    line.set_field_amount(
        FieldId::HighLimit,
        Amount::new(1_000_000, Issue::new(currency, high)),
    );
    line.set_field_u64(FieldId::LowNode, 0);
    line.set_field_u64(FieldId::HighNode, 0);
    line
}

pub fn fresh_set(ledger: Ledger) -> EntrySet {
    let sequence = ledger.sequence();
    EntrySet::new(Arc::new(ledger), tx_id(0xee), sequence, TxParams::default())
}
