//! Referee registration.
//!
//! An account names its referee once; the resulting ancestry chain is
//! what transit-fee sharing walks.

use freshet_common::{Ter, TerResult};
use freshet_ledger::{index, EntryType, FieldId};

use crate::frame::TxData;
use crate::transactor::Transactor;

pub fn apply(tr: &mut Transactor) -> TerResult<()> {
    let TxData::AddReferee { referee } = tr.tx.data else {
        return Err(Ter::TefInternal);
    };

    if referee.is_zero() {
        return Err(Ter::TemDstNeeded);
    }
    if referee == tr.account_id {
        return Err(Ter::TemDstIsSrc);
    }
    if tr
        .nodes
        .entry_cache(EntryType::AccountRoot, index::account_index(referee))?
        .is_none()
    {
        return Err(Ter::TecNoDst);
    }

    let mut root = tr.source_root()?;
    if root.has_field(FieldId::Referee) {
        return Err(Ter::TemRedundant);
    }
    root.set_field_account(FieldId::Referee, referee);
    tr.nodes.entry_modify(&root)
}
