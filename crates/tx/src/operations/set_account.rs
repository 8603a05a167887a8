//! Account-root settings.

use freshet_common::protocol::QUALITY_ONE;
use freshet_common::{Ter, TerResult};
use freshet_ledger::{account_flags, FieldId};

use crate::frame::TxData;
use crate::transactor::Transactor;

pub fn apply(tr: &mut Transactor) -> TerResult<()> {
    let TxData::SetAccount {
        set_flag,
        clear_flag,
        transfer_rate,
    } = tr.tx.data
    else {
        return Err(Ter::TefInternal);
    };

    let mut root = tr.source_root()?;

    if let Some(mask) = set_flag {
        // Turning the master key off requires proving possession of it.
        if mask & account_flags::DISABLE_MASTER != 0 && !tr.sig_master {
            return Err(Ter::TecNeedMasterKey);
        }
        root.set_flag(mask);
    }

    if let Some(mask) = clear_flag {
        let mut mask = mask;
        if root.is_flag(account_flags::NO_FREEZE) {
            // An account that renounced freezing can never thaw a global
            // freeze.
            mask &= !account_flags::GLOBAL_FREEZE;
        }
        root.clear_flag(mask);
    }

    if let Some(rate) = transfer_rate {
        if rate != 0 && rate < QUALITY_ONE {
            return Err(Ter::TemBadTransferRate);
        }
        if rate == 0 || rate == QUALITY_ONE {
            root.clear_field(FieldId::TransferRate);
        } else {
            root.set_field_u32(FieldId::TransferRate, rate);
        }
    }

    tr.nodes.entry_modify(&root)
}
