//! Offer cancellation.

use freshet_common::{Ter, TerResult};
use freshet_ledger::{index, EntryType};
use tracing::debug;

use crate::frame::TxData;
use crate::transactor::Transactor;

pub fn apply(tr: &mut Transactor) -> TerResult<()> {
    let TxData::CancelOffer { offer_sequence } = tr.tx.data else {
        return Err(Ter::TefInternal);
    };

    // The canceled offer must predate this transaction.
    if offer_sequence == 0 || tr.tx.sequence <= offer_sequence {
        return Err(Ter::TemBadSequence);
    }

    let idx = index::offer_index(tr.account_id, offer_sequence);
    match tr.nodes.entry_cache(EntryType::Offer, idx)? {
        Some(offer) => tr.nodes.offer_delete(&offer),
        None => {
            // Canceling an offer that is already gone succeeds.
            debug!(sequence = offer_sequence, "cancel of missing offer");
            Ok(())
        }
    }
}
