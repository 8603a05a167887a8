//! Dividend rounds.
//!
//! A round opens with `Start`, stamps participating accounts with their
//! spread via `Apply`, and closes with `Done`. Referee fee sharing only
//! reads closed rounds, so half-applied rounds never leak into fee
//! distribution.

use freshet_common::{Ter, TerResult};
use freshet_ledger::{dividend_state, index, EntryType, FieldId};
use tracing::info;

use crate::frame::{DividendKind, TxData};
use crate::transactor::Transactor;

pub fn apply(tr: &mut Transactor) -> TerResult<()> {
    let TxData::Dividend { kind } = tr.tx.data else {
        return Err(Ter::TefInternal);
    };

    let idx = index::dividend_index();

    match kind {
        DividendKind::Start {
            dividend_ledger,
            dividend_coins,
        } => {
            let mut object = match tr.nodes.entry_cache(EntryType::DividendObject, idx)? {
                Some(entry) => entry,
                None => tr.nodes.entry_create(EntryType::DividendObject, idx)?,
            };
            object.set_field_u8(FieldId::DividendState, dividend_state::COLLECTING);
            object.set_field_u32(FieldId::DividendLedger, dividend_ledger);
            object.set_field_u64(FieldId::DividendCoins, dividend_coins);
            info!(dividend_ledger, "dividend round opened");
            tr.nodes.entry_modify(&object)
        }

        DividendKind::Apply { account, vsprd } => {
            let Some(object) = tr.nodes.entry_cache(EntryType::DividendObject, idx)? else {
                return Err(Ter::TefBadLedger);
            };
            if object.field_u8(FieldId::DividendState) != dividend_state::COLLECTING {
                return Err(Ter::TefBadLedger);
            }
            let round = object.field_u32(FieldId::DividendLedger);

            let Some(mut root) = tr
                .nodes
                .entry_cache(EntryType::AccountRoot, index::account_index(account))?
            else {
                return Err(Ter::TerNoAccount);
            };
            root.set_field_u32(FieldId::DividendLedger, round);
            root.set_field_u64(FieldId::DividendVSprd, vsprd);
            tr.nodes.entry_modify(&root)
        }

        DividendKind::Done => {
            let Some(mut object) = tr.nodes.entry_cache(EntryType::DividendObject, idx)? else {
                return Err(Ter::TefBadLedger);
            };
            object.set_field_u8(FieldId::DividendState, dividend_state::DONE);
            info!("dividend round closed");
            tr.nodes.entry_modify(&object)
        }
    }
}
