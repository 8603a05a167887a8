//! Offer placement.
//!
//! Places the offer entry and links it into the owner directory and the
//! book directory. Crossing against resting offers is the order-book
//! engine's concern; it runs before placement and is external to this
//! engine.

use freshet_common::{Ter, TerResult};
use freshet_ledger::{
    index, offer_flags, owner_dir_describer, EntryType, FieldId,
};

use crate::frame::TxData;
use crate::holds::FreezeHandling;
use crate::transactor::Transactor;

pub fn apply(tr: &mut Transactor) -> TerResult<()> {
    let TxData::CreateOffer {
        taker_pays,
        taker_gets,
        passive,
        sell,
    } = tr.tx.data
    else {
        return Err(Ter::TefInternal);
    };

    if !taker_pays.is_positive() || !taker_gets.is_positive() {
        return Err(Ter::TemBadOffer);
    }
    if taker_pays.issue() == taker_gets.issue() {
        return Err(Ter::TemRedundant);
    }

    let account = tr.account_id;

    let funds = tr
        .nodes
        .account_funds(account, taker_gets, FreezeHandling::ZeroIfFrozen)?;
    if !funds.is_positive() {
        return Err(Ter::TecUnfundedOffer);
    }

    // An offer is a new owned entry: check the enlarged reserve.
    let source_root = tr.source_root()?;
    let owner_count = source_root.field_u32(FieldId::OwnerCount);
    let reserve = tr.nodes.ledger().reserve(owner_count + 1) as i64;
    let balance = source_root
        .field_amount(FieldId::Balance)
        .map(|a| a.value())
        .unwrap_or(0);
    if balance < reserve {
        return Err(Ter::TecInsufReserveOffer);
    }

    let idx = index::offer_index(account, tr.tx.sequence);
    let book = index::book_index(taker_pays.issue(), taker_gets.issue());

    let mut offer = tr.nodes.entry_create(EntryType::Offer, idx)?;
    offer.set_field_account(FieldId::Account, account);
    offer.set_field_u32(FieldId::Sequence, tr.tx.sequence);
    offer.set_field_amount(FieldId::TakerPays, taker_pays);
    offer.set_field_amount(FieldId::TakerGets, taker_gets);
    offer.set_field_hash(FieldId::BookDirectory, book);
    if passive {
        offer.set_flag(offer_flags::PASSIVE);
    }
    if sell {
        offer.set_flag(offer_flags::SELL);
    }

    let owner_node = tr
        .nodes
        .dir_add(index::owner_dir_index(account), idx, |page, is_root| {
            owner_dir_describer(page, is_root, account)
        })?;
    let book_node = tr.nodes.dir_add(book, idx, |_, _| {})?;

    offer.set_field_u64(FieldId::OwnerNode, owner_node);
    offer.set_field_u64(FieldId::BookNode, book_node);

    tr.nodes.increment_owner_count(account)?;
    tr.nodes.entry_modify(&offer)
}
