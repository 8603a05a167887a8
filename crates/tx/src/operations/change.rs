//! Consensus maintenance: amendments and fee settings.
//!
//! These frames originate from validator consensus, not from an account;
//! the driver admits them only as administrative submissions with a null
//! source.

use freshet_common::{Ter, TerResult};
use freshet_ledger::{index, EntryType, FieldId};
use tracing::info;

use crate::frame::TxData;
use crate::transactor::Transactor;

pub fn apply(tr: &mut Transactor) -> TerResult<()> {
    let TxData::Change {
        base_fee,
        reserve_base,
        reserve_increment,
        amendment,
    } = tr.tx.data
    else {
        return Err(Ter::TefInternal);
    };

    if let Some(feature) = amendment {
        let idx = index::amendments_index();
        let mut amendments = match tr.nodes.entry_cache(EntryType::Amendments, idx)? {
            Some(entry) => entry,
            None => tr.nodes.entry_create(EntryType::Amendments, idx)?,
        };

        let mut enabled = amendments.field_vector(FieldId::Amendments);
        if enabled.contains(&feature) {
            return Err(Ter::TefAlready);
        }
        info!(amendment = %feature, "enabling amendment");
        enabled.push(feature);
        amendments.set_field_vector(FieldId::Amendments, enabled);
        tr.nodes.entry_modify(&amendments)?;
    }

    if base_fee.is_some() || reserve_base.is_some() || reserve_increment.is_some() {
        let idx = index::fee_index();
        let mut fees = match tr.nodes.entry_cache(EntryType::FeeSettings, idx)? {
            Some(entry) => entry,
            None => tr.nodes.entry_create(EntryType::FeeSettings, idx)?,
        };

        if let Some(fee) = base_fee {
            fees.set_field_u64(FieldId::BaseFee, fee);
        }
        if let Some(reserve) = reserve_base {
            fees.set_field_u32(FieldId::ReserveBase, reserve);
        }
        if let Some(increment) = reserve_increment {
            fees.set_field_u32(FieldId::ReserveIncrement, increment);
        }
        info!("updating fee settings");
        tr.nodes.entry_modify(&fees)?;
    }

    Ok(())
}
