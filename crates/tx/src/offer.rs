//! Offer removal.

use freshet_common::TerResult;
use freshet_ledger::{index, Entry, FieldId};
use tracing::trace;

use crate::entry_set::EntrySet;

impl EntrySet {
    /// Remove an offer from its owner directory and its book directory,
    /// release the owner's reserve, and delete the entry.
    ///
    /// The owner-directory removal is order-insensitive and tolerates a
    /// missing page hint on entries that predate hint recording; the book
    /// removal is order-preserving because book ordering is
    /// price-significant. Both removals are attempted; the owner-side
    /// error wins, then the book-side one.
    pub fn offer_delete(&mut self, offer: &Entry) -> TerResult<()> {
        let offer_index = offer.index();
        let owner = offer.field_account(FieldId::Account);

        trace!(index = %offer_index, %owner, "offer_delete");

        let has_owner_node = offer.has_field(FieldId::OwnerNode);
        let owner_node = offer.field_u64(FieldId::OwnerNode);
        let book_directory = offer.field_hash(FieldId::BookDirectory);
        let book_node = offer.field_u64(FieldId::BookNode);

        let owner_result = self.dir_delete(
            false,
            owner_node,
            index::owner_dir_index(owner),
            offer_index,
            false,
            !has_owner_node,
        );
        let book_result = self.dir_delete(
            false,
            book_node,
            book_directory,
            offer_index,
            true,
            false,
        );

        if owner_result.is_ok() {
            self.decrement_owner_count(owner)?;
        }

        self.entry_delete(offer)?;

        owner_result.and(book_result)
    }
}
