//! Regular-key assignment.

use freshet_common::{Ter, TerResult};
use freshet_ledger::FieldId;

use crate::frame::TxData;
use crate::transactor::Transactor;

pub fn apply(tr: &mut Transactor) -> TerResult<()> {
    let TxData::SetRegularKey { regular_key } = tr.tx.data else {
        return Err(Ter::TefInternal);
    };

    let mut root = tr.source_root()?;
    match regular_key {
        Some(key) => root.set_field_account(FieldId::RegularKey, key),
        None => root.clear_field(FieldId::RegularKey),
    }
    tr.nodes.entry_modify(&root)
}
