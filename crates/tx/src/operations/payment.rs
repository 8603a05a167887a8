//! Direct payments.
//!
//! Native payments move drops between account roots; IOU payments ride
//! the issuer-mediated send, which charges the transit fee and feeds the
//! referee share. Multi-hop path execution belongs to the path engine and
//! never reaches this handler.

use freshet_common::{AccountId, Ter, TerResult};
use freshet_ledger::{index, EntryType};

use crate::frame::TxData;
use crate::holds::FreezeHandling;
use crate::transactor::Transactor;

pub fn apply(tr: &mut Transactor) -> TerResult<()> {
    let TxData::Payment {
        destination,
        amount,
    } = tr.tx.data
    else {
        return Err(Ter::TefInternal);
    };

    if destination.is_zero() {
        return Err(Ter::TemDstNeeded);
    }
    if destination == tr.account_id {
        return Err(Ter::TemRedundant);
    }
    if !amount.is_positive() {
        return Err(Ter::TemBadAmount);
    }

    if tr
        .nodes
        .entry_cache(EntryType::AccountRoot, index::account_index(destination))?
        .is_none()
    {
        return Err(Ter::TecNoDst);
    }

    if amount.is_native() {
        let spendable = tr.nodes.account_holds(
            tr.account_id,
            amount.currency(),
            AccountId::ZERO,
            FreezeHandling::ZeroIfFrozen,
        )?;
        if spendable.value() < amount.value() {
            return Err(Ter::TecUnfundedPayment);
        }
        return tr.nodes.account_send(tr.account_id, destination, amount);
    }

    if tr
        .nodes
        .is_frozen(tr.account_id, amount.currency(), amount.issuer())?
    {
        return Err(Ter::TecFrozen);
    }

    let funds = tr
        .nodes
        .account_funds(tr.account_id, amount, FreezeHandling::ZeroIfFrozen)?;
    if funds.value() < amount.value() {
        return Err(Ter::TecUnfundedPayment);
    }

    tr.nodes
        .ripple_send(tr.account_id, destination, amount)
        .map(|_| ())
}
