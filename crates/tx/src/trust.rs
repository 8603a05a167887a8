//! Trust-line creation and deletion.
//!
//! A trust line is a single `RippleState` entry shared by two accounts,
//! with the endpoints ordered canonically into a low and a high side. The
//! entry is referenced from both owner directories; the page numbers are
//! remembered on the line (`LowNode`/`HighNode`) as deletion hints.

use freshet_common::{AccountId, Amount, Hash256, Issue, TerResult};
use freshet_ledger::{index, line_flags, owner_dir_describer, EntryType, FieldId};
use tracing::trace;

use crate::entry_set::EntrySet;

impl EntrySet {
    /// Create the trust line between `src` and `dst` at `idx`.
    ///
    /// `limit.issuer()` names the endpoint whose side is being configured:
    /// the limit, quality, and flag arguments land on that side, and the
    /// opposite side gets a zero limit issued by the other account. The
    /// configured side also takes the reserve flag, and `set_account`
    /// (the account paying reserve) has its owner count bumped.
    ///
    /// `balance` is given in the configured side's terms and stored
    /// negated when that side is the high one; its issuer should be the
    /// null account.
    #[allow(clippy::too_many_arguments)]
    pub fn trust_create(
        &mut self,
        src_high: bool,
        src: AccountId,
        dst: AccountId,
        idx: Hash256,
        set_account: AccountId,
        auth: bool,
        no_ripple: bool,
        freeze: bool,
        balance: Amount,
        limit: Amount,
        quality_in: u32,
        quality_out: u32,
    ) -> TerResult<()> {
        let low_account = if src_high { dst } else { src };
        let high_account = if src_high { src } else { dst };

        trace!(%src, %dst, index = %idx, "trust_create");

        let mut line = self.entry_create(EntryType::RippleState, idx)?;

        let low_node = self.dir_add(index::owner_dir_index(low_account), idx, |page, is_root| {
            owner_dir_describer(page, is_root, low_account)
        })?;
        let high_node = self.dir_add(index::owner_dir_index(high_account), idx, |page, is_root| {
            owner_dir_describer(page, is_root, high_account)
        })?;

        let set_dst = limit.issuer() == dst;
        let set_high = src_high ^ set_dst;

        // Deletion hints.
        line.set_field_u64(FieldId::LowNode, low_node);
        line.set_field_u64(FieldId::HighNode, high_node);

        line.set_field_amount(
            if set_high {
                FieldId::HighLimit
            } else {
                FieldId::LowLimit
            },
            limit,
        );
        line.set_field_amount(
            if set_high {
                FieldId::LowLimit
            } else {
                FieldId::HighLimit
            },
            Amount::zeroed(Issue::new(
                balance.currency(),
                if set_dst { src } else { dst },
            )),
        );

        if quality_in != 0 {
            line.set_field_u32(
                if set_high {
                    FieldId::HighQualityIn
                } else {
                    FieldId::LowQualityIn
                },
                quality_in,
            );
        }
        if quality_out != 0 {
            line.set_field_u32(
                if set_high {
                    FieldId::HighQualityOut
                } else {
                    FieldId::LowQualityOut
                },
                quality_out,
            );
        }

        let mut flags = line_flags::sided(set_high, line_flags::LOW_RESERVE, line_flags::HIGH_RESERVE);
        if auth {
            flags |= line_flags::sided(set_high, line_flags::LOW_AUTH, line_flags::HIGH_AUTH);
        }
        if no_ripple {
            flags |= line_flags::sided(
                set_high,
                line_flags::LOW_NO_RIPPLE,
                line_flags::HIGH_NO_RIPPLE,
            );
        }
        if freeze {
            flags |= line_flags::sided(set_high, line_flags::LOW_FREEZE, line_flags::HIGH_FREEZE);
        }
        line.set_field_u32(FieldId::Flags, flags);

        self.increment_owner_count(set_account)?;

        // Balance lives in low terms.
        line.set_field_amount(
            FieldId::Balance,
            if set_high { balance.negated() } else { balance },
        );

        self.entry_modify(&line)
    }

    /// Delete a trust line: unlink it from both owner directories, then
    /// drop the entry.
    ///
    /// Both directory deletions are attempted even if the first fails, so
    /// a broken ledger reports the same way regardless of which side is
    /// damaged; the first error wins.
    pub fn trust_delete(
        &mut self,
        line: &freshet_ledger::Entry,
        low_account: AccountId,
        high_account: AccountId,
    ) -> TerResult<()> {
        // Entries from before deletion hints were recorded lack the node
        // fields; fall back to soft probing for those.
        let soft_low = !line.has_field(FieldId::LowNode);
        let soft_high = !line.has_field(FieldId::HighNode);
        let low_node = line.field_u64(FieldId::LowNode);
        let high_node = line.field_u64(FieldId::HighNode);

        trace!(index = %line.index(), "trust_delete: low side");
        let low_result = self.dir_delete(
            false,
            low_node,
            index::owner_dir_index(low_account),
            line.index(),
            false,
            soft_low,
        );

        trace!(index = %line.index(), "trust_delete: high side");
        let high_result = self.dir_delete(
            false,
            high_node,
            index::owner_dir_index(high_account),
            line.index(),
            false,
            soft_high,
        );

        trace!(index = %line.index(), "trust_delete: state entry");
        self.entry_delete(line)?;

        low_result.and(high_result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry_set::{EntryAction, TxParams};
    use freshet_common::{Currency, Hash256};
    use freshet_ledger::{Entry, Ledger};
    use std::sync::Arc;

    fn account(seed: u8) -> AccountId {
        AccountId::from_bytes([seed; 20])
    }

    fn ledger_with_accounts(seeds: &[u8]) -> Arc<Ledger> {
        let mut ledger = Ledger::new(3);
        for &seed in seeds {
            let id = account(seed);
            let mut root = Entry::new(EntryType::AccountRoot, index::account_index(id));
            root.set_field_account(FieldId::Account, id);
            root.set_field_amount(FieldId::Balance, Amount::drops(10_000_000_000));
            ledger.insert_entry(root);
        }
        Arc::new(ledger)
    }

    fn fresh_set(seeds: &[u8]) -> EntrySet {
        EntrySet::new(
            ledger_with_accounts(seeds),
            Hash256::from_bytes([0xab; 32]),
            3,
            TxParams::default(),
        )
    }

    #[test]
    fn create_links_both_owner_directories() {
        let mut set = fresh_set(&[1, 2]);
        let usd = Currency::from_code("USD");
        let idx = index::line_index(account(1), account(2), usd);
        let limit = Amount::new(100, Issue::new(usd, account(1)));

        set.trust_create(
            false,
            account(1),
            account(2),
            idx,
            account(1),
            false,
            false,
            false,
            Amount::zeroed(Issue::new(usd, AccountId::ZERO)),
            limit,
            0,
            0,
        )
        .unwrap();

        assert_eq!(set.dir_count(index::owner_dir_index(account(1))).unwrap(), 1);
        assert_eq!(set.dir_count(index::owner_dir_index(account(2))).unwrap(), 1);

        let (line, action) = set.get_entry(&idx).unwrap();
        assert_eq!(action, EntryAction::Created);
        // src is low and the limit issuer is src: the low side was set.
        assert!(line.is_flag(line_flags::LOW_RESERVE));
        assert!(!line.is_flag(line_flags::HIGH_RESERVE));
        assert_eq!(line.field_amount(FieldId::LowLimit).unwrap().value(), 100);
        assert_eq!(line.field_amount(FieldId::HighLimit).unwrap().value(), 0);
        assert_eq!(
            line.field_amount(FieldId::HighLimit).unwrap().issuer(),
            account(2)
        );

        let (root, _) = set.get_entry(&index::account_index(account(1))).unwrap();
        assert_eq!(root.field_u32(FieldId::OwnerCount), 1);
    }

    #[test]
    fn balance_is_negated_when_set_side_is_high() {
        // src = 2 (high), limit issued by dst -> set side is low... flip it:
        // limit issued by src itself, so set side follows src (high).
        let mut set = fresh_set(&[1, 2]);
        let usd = Currency::from_code("USD");
        let idx = index::line_index(account(1), account(2), usd);

        set.trust_create(
            true,
            account(2),
            account(1),
            idx,
            account(2),
            false,
            false,
            false,
            Amount::new(30, Issue::new(usd, AccountId::ZERO)),
            Amount::new(100, Issue::new(usd, account(2))),
            0,
            0,
        )
        .unwrap();

        let (line, _) = set.get_entry(&idx).unwrap();
        // Balance is stored in low terms: the high side holding +30 reads
        // as -30 from the low perspective.
        assert_eq!(line.field_amount(FieldId::Balance).unwrap().value(), -30);
        assert!(line.is_flag(line_flags::HIGH_RESERVE));
        assert_eq!(line.field_amount(FieldId::HighLimit).unwrap().value(), 100);
    }

    #[test]
    fn delete_removes_line_and_directory_references() {
        let mut set = fresh_set(&[1, 2]);
        let usd = Currency::from_code("USD");
        let idx = index::line_index(account(1), account(2), usd);

        set.trust_create(
            false,
            account(1),
            account(2),
            idx,
            account(1),
            false,
            false,
            false,
            Amount::zeroed(Issue::new(usd, AccountId::ZERO)),
            Amount::new(50, Issue::new(usd, account(1))),
            0,
            0,
        )
        .unwrap();

        let (line, _) = set.get_entry(&idx).unwrap();
        set.trust_delete(&line, account(1), account(2)).unwrap();

        assert!(set
            .entry_cache(EntryType::RippleState, idx)
            .unwrap()
            .is_none());
        assert_eq!(set.dir_count(index::owner_dir_index(account(1))).unwrap(), 0);
        assert_eq!(set.dir_count(index::owner_dir_index(account(2))).unwrap(), 0);
    }

    #[test]
    fn quality_fields_are_side_selected() {
        let mut set = fresh_set(&[1, 2]);
        let usd = Currency::from_code("USD");
        let idx = index::line_index(account(1), account(2), usd);

        set.trust_create(
            false,
            account(1),
            account(2),
            idx,
            account(1),
            false,
            true,
            false,
            Amount::zeroed(Issue::new(usd, AccountId::ZERO)),
            Amount::new(10, Issue::new(usd, account(1))),
            9_000,
            11_000,
        )
        .unwrap();

        let (line, _) = set.get_entry(&idx).unwrap();
        assert_eq!(line.field_u32(FieldId::LowQualityIn), 9_000);
        assert_eq!(line.field_u32(FieldId::LowQualityOut), 11_000);
        assert!(!line.has_field(FieldId::HighQualityIn));
        assert!(line.is_flag(line_flags::LOW_NO_RIPPLE));
        assert!(!line.is_flag(line_flags::HIGH_NO_RIPPLE));
    }
}
