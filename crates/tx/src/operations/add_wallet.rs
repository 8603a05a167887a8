//! Wallet creation: fund a brand-new account root from the source.

use freshet_common::{AccountId, Ter, TerResult};
use freshet_ledger::{index, EntryType, FieldId};

use crate::frame::TxData;
use crate::holds::FreezeHandling;
use crate::transactor::Transactor;

pub fn apply(tr: &mut Transactor) -> TerResult<()> {
    let TxData::AddWallet {
        destination,
        amount,
    } = tr.tx.data
    else {
        return Err(Ter::TefInternal);
    };

    if !amount.is_native() || amount.is_negative() {
        return Err(Ter::TemBadAmount);
    }
    if destination.is_zero() {
        return Err(Ter::TemDstNeeded);
    }

    let idx = index::account_index(destination);
    if tr.nodes.entry_cache(EntryType::AccountRoot, idx)?.is_some() {
        return Err(Ter::TefCreated);
    }

    let spendable = tr.nodes.account_holds(
        tr.account_id,
        amount.currency(),
        AccountId::ZERO,
        FreezeHandling::IgnoreFreeze,
    )?;
    if spendable.value() < amount.value() {
        return Err(Ter::TecUnfundedPayment);
    }

    let mut root = tr.nodes.entry_create(EntryType::AccountRoot, idx)?;
    root.set_field_account(FieldId::Account, destination);
    root.set_field_u32(FieldId::Sequence, 1);
    root.set_field_amount(FieldId::Balance, amount.with_value(0));
    tr.nodes.entry_modify(&root)?;

    tr.nodes.account_send(tr.account_id, destination, amount)
}
