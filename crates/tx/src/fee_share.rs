//! Referee fee sharing.
//!
//! When an issuer charges a transit fee, a quarter of it is offered to the
//! sender's referee ancestry: the chain of accounts reachable through the
//! `Referee` field, up to five levels. An ancestor qualifies only when it
//! participated in the most recent completed dividend round with enough
//! accumulated spread. Whatever the chain does not absorb stays with the
//! issuer.

use std::collections::BTreeMap;

use freshet_common::math::{big_divide, Rounding};
use freshet_common::protocol::{MAX_REFEREE_HEIGHT, MIN_VSPD_TO_GET_FEE_SHARE};
use freshet_common::{AccountId, Amount, Ter, TerResult};
use freshet_ledger::{dividend_state, FieldId};
use tracing::{debug, error, info};

use crate::entry_set::EntrySet;

impl EntrySet {
    /// Distribute `amount` (the referee slice of a transit fee) across the
    /// sender's qualifying ancestors, crediting from the issuer.
    ///
    /// Each qualifying ancestor receives a fifth of the slice; if fewer
    /// than five qualify, the last one also receives the undistributed
    /// remainder. Credited accounts are recorded in the transaction
    /// metadata's fee-share takers.
    pub fn share_fee_with_referee(
        &mut self,
        sender: AccountId,
        issuer: AccountId,
        amount: Amount,
    ) -> TerResult<()> {
        info!(%sender, %issuer, %amount, "fee share");

        let Some(dividend) = self.ledger().dividend_object() else {
            return Ok(());
        };
        if dividend.field_u8(FieldId::DividendState) != dividend_state::DONE {
            return Ok(());
        }
        let dividend_ledger = dividend.field_u32(FieldId::DividendLedger);

        // An even fifth of the slice per qualifying ancestor.
        let share_each = amount.with_value(
            big_divide(amount.value(), 20, 100, Rounding::Down).map_err(|err| {
                error!(%err, "fee share division overflow");
                Ter::TefInternal
            })?,
        );

        let mut takers: BTreeMap<AccountId, Amount> = BTreeMap::new();
        let mut credited = 0usize;
        let mut last_taker = AccountId::ZERO;

        // Walk up the referee chain starting at the sender itself. The
        // chain is read from the parent snapshot: qualification is judged
        // against the closed ledger, not this transaction's staged state.
        let mut current = self.ledger().account_root(sender);
        while credited < MAX_REFEREE_HEIGHT {
            let Some(node) = current else { break };
            if !node.has_field(FieldId::Referee) {
                break;
            }
            let referee = node.field_account(FieldId::Referee);
            let referee_root = self.ledger().account_root(referee);

            if let Some(ref root) = referee_root {
                let qualified = root.has_field(FieldId::DividendLedger)
                    && root.field_u32(FieldId::DividendLedger) == dividend_ledger
                    && root.field_u64(FieldId::DividendVSprd) > MIN_VSPD_TO_GET_FEE_SHARE;
                if qualified {
                    self.ripple_credit(issuer, referee, share_each, true)?;
                    credited += 1;
                    last_taker = referee;
                    takers
                        .entry(referee)
                        .and_modify(|total| *total = total.with_value(total.value() + share_each.value()))
                        .or_insert(share_each);
                    info!(%referee, %share_each, "fee share: credited ancestor");
                }
            }

            current = referee_root;
        }

        if credited == 0 {
            info!("fee share: no qualifying ancestor, issuer keeps the share");
            return Ok(());
        }

        if credited < MAX_REFEREE_HEIGHT {
            // The undistributed fifths go to the last qualifying ancestor.
            let remainder =
                share_each.with_value(share_each.value() * (MAX_REFEREE_HEIGHT - credited) as i64);
            if !remainder.is_zero() {
                self.ripple_credit(issuer, last_taker, remainder, true)?;
            }
            let Some(total) = takers.get_mut(&last_taker) else {
                error!(%last_taker, "fee share: remainder taker missing from record");
                debug_assert!(false, "credited taker must be recorded");
                return Err(Ter::TefInternal);
            };
            *total = total.with_value(total.value() + remainder.value());
            debug!(%remainder, %last_taker, "fee share: remainder to last ancestor");
        }

        for (account, total) in takers {
            self.meta.add_fee_share_taker(account, total);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry_set::TxParams;
    use crate::holds::FreezeHandling;
    use freshet_common::{Currency, Hash256, Issue};
    use freshet_ledger::{index, Entry, EntryType, Ledger};
    use std::sync::Arc;

    fn account(seed: u8) -> AccountId {
        AccountId::from_bytes([seed; 20])
    }

    fn usd(issuer: AccountId) -> Amount {
        Amount::new(0, Issue::new(Currency::from_code("USD"), issuer))
    }

    /// Ledger with issuer 9, sender 1, and a referee chain 1 -> 2 -> 3 -> 4
    /// where the given seeds qualify for the completed round 40.
    fn build_ledger(qualified: &[u8]) -> Arc<Ledger> {
        let mut ledger = Ledger::new(50);

        let mut dividend = Entry::new(EntryType::DividendObject, index::dividend_index());
        dividend.set_field_u8(FieldId::DividendState, dividend_state::DONE);
        dividend.set_field_u32(FieldId::DividendLedger, 40);
        ledger.insert_entry(dividend);

        for seed in [1u8, 2, 3, 4, 9] {
            let id = account(seed);
            let mut root = Entry::new(EntryType::AccountRoot, index::account_index(id));
            root.set_field_account(FieldId::Account, id);
            root.set_field_amount(FieldId::Balance, Amount::drops(1_000_000_000));
            if seed >= 1 && seed < 4 {
                root.set_field_account(FieldId::Referee, account(seed + 1));
            }
            if qualified.contains(&seed) {
                root.set_field_u32(FieldId::DividendLedger, 40);
                root.set_field_u64(FieldId::DividendVSprd, MIN_VSPD_TO_GET_FEE_SHARE + 1);
            }
            ledger.insert_entry(root);
        }
        Arc::new(ledger)
    }

    fn fresh_set(qualified: &[u8]) -> EntrySet {
        EntrySet::new(
            build_ledger(qualified),
            Hash256::from_bytes([0x55; 32]),
            50,
            TxParams::default(),
        )
    }

    fn holds(set: &mut EntrySet, seed: u8) -> i64 {
        set.ripple_holds(
            account(seed),
            Currency::from_code("USD"),
            account(9),
            FreezeHandling::IgnoreFreeze,
        )
        .unwrap()
        .value()
    }

    #[test]
    fn no_dividend_round_keeps_share_with_issuer() {
        let mut ledger = Ledger::new(50);
        let mut root = Entry::new(EntryType::AccountRoot, index::account_index(account(1)));
        root.set_field_account(FieldId::Account, account(1));
        ledger.insert_entry(root);
        let mut set = EntrySet::new(
            Arc::new(ledger),
            Hash256::from_bytes([0x56; 32]),
            50,
            TxParams::default(),
        );

        set.share_fee_with_referee(account(1), account(9), usd(account(9)).with_value(500))
            .unwrap();
        assert!(set.changes().is_empty());
        assert!(set.meta().fee_share_takers().is_empty());
    }

    #[test]
    fn partial_chain_remainder_goes_to_last() {
        // Ancestors 2 and 3 qualify; 4 does not.
        let mut set = fresh_set(&[2, 3]);
        set.share_fee_with_referee(account(1), account(9), usd(account(9)).with_value(500))
            .unwrap();

        // 500 / 5 = 100 each; remainder 300 lands on the last (3).
        assert_eq!(holds(&mut set, 2), 100);
        assert_eq!(holds(&mut set, 3), 100 + 300);

        let takers = set.meta().fee_share_takers();
        assert_eq!(takers.len(), 2);
        let recorded: BTreeMap<AccountId, i64> = takers
            .iter()
            .map(|taker| (taker.account, taker.amount.value()))
            .collect();
        assert_eq!(recorded[&account(2)], 100);
        assert_eq!(recorded[&account(3)], 400);
    }

    #[test]
    fn unqualified_chain_credits_nothing() {
        let mut set = fresh_set(&[]);
        set.share_fee_with_referee(account(1), account(9), usd(account(9)).with_value(500))
            .unwrap();
        assert!(set.meta().fee_share_takers().is_empty());
        assert_eq!(holds(&mut set, 2), 0);
    }

    #[test]
    fn chain_walk_skips_unqualified_middles() {
        // 2 does not qualify but the walk continues through it to 3.
        let mut set = fresh_set(&[3]);
        set.share_fee_with_referee(account(1), account(9), usd(account(9)).with_value(500))
            .unwrap();

        assert_eq!(holds(&mut set, 2), 0);
        assert_eq!(holds(&mut set, 3), 500);
    }
}
