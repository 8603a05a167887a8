//! The value-movement protocol: direct credits, issuer-mediated sends,
//! and native transfers.
//!
//! `ripple_credit` moves IOUs along a single trust line, creating the line
//! when needed and deleting it again when it falls back to its default
//! zero state. `ripple_send` routes third-party IOUs through the issuer,
//! charging the issuer's transit fee and sharing a slice of it with the
//! sender's referee ancestry. `account_send` dispatches between the native
//! balances and the IOU path.

use freshet_common::math::{big_divide, Rounding};
use freshet_common::protocol::{FEE_SHARE_RATE, QUALITY_ONE};
use freshet_common::{AccountId, Amount, Ter, TerResult};
use freshet_ledger::{index, line_flags, EntryType, FieldId};
use tracing::{debug, error, trace};

use crate::entry_set::EntrySet;

impl EntrySet {
    /// The issuer's transfer rate, `QUALITY_ONE` when unset.
    pub fn transfer_rate(&mut self, issuer: AccountId) -> TerResult<u32> {
        let root = self.entry_cache(EntryType::AccountRoot, index::account_index(issuer))?;
        Ok(match root {
            Some(root) if root.has_field(FieldId::TransferRate) => {
                root.field_u32(FieldId::TransferRate)
            }
            _ => QUALITY_ONE,
        })
    }

    /// The transit fee the issuer charges for moving `amount` between two
    /// third parties. Zero when either endpoint is the issuer or the rate
    /// is `QUALITY_ONE`.
    pub fn transfer_fee(
        &mut self,
        sender: AccountId,
        receiver: AccountId,
        issuer: AccountId,
        amount: Amount,
    ) -> TerResult<Amount> {
        if sender != issuer && receiver != issuer {
            let rate = self.transfer_rate(issuer)?;
            if rate != QUALITY_ONE {
                let total = big_divide(
                    amount.value(),
                    rate as i64,
                    QUALITY_ONE as i64,
                    Rounding::Down,
                )
                .map_err(|err| {
                    error!(%err, "transfer_fee overflow");
                    Ter::TefInternal
                })?;
                let fee = amount.with_value(total - amount.value());
                debug!(%fee, "transfer_fee");
                return Ok(fee);
            }
        }
        Ok(amount.with_value(0))
    }

    /// Direct credit along the sender/receiver trust line, without fees:
    /// redeeming the receiver's IOUs and/or issuing the sender's own.
    ///
    /// Creates the line (zero limit on the receiver side) when absent.
    /// When the sender's side drops to zero or below and carries nothing
    /// but the reserve flag, the reserve is released; if the whole line is
    /// then in its default state it is deleted.
    pub fn ripple_credit(
        &mut self,
        sender: AccountId,
        receiver: AccountId,
        amount: Amount,
        check_issuer: bool,
    ) -> TerResult<()> {
        let issuer = amount.issuer();
        let currency = amount.currency();

        debug_assert!(
            !check_issuer || sender == issuer || receiver == issuer,
            "issuer must be party to a checked credit"
        );
        debug_assert!(sender != receiver);
        debug_assert!(!sender.is_zero() && !receiver.is_zero());
        debug_assert!(!currency.is_native());

        let sender_high = sender > receiver;
        let idx = index::line_index(sender, receiver, currency);

        let Some(mut line) = self.entry_cache(EntryType::RippleState, idx)? else {
            debug!(%sender, %receiver, %amount, "ripple_credit: create line");

            let receiver_limit = Amount::zeroed(freshet_common::Issue::new(currency, receiver));
            return self.trust_create(
                sender_high,
                sender,
                receiver,
                idx,
                receiver,
                false,
                false,
                false,
                amount.with_issuer(AccountId::ZERO),
                receiver_limit,
                0,
                0,
            );
        };

        let stored = line
            .field_amount(FieldId::Balance)
            .map(|a| a.value())
            .unwrap_or(0);
        // Balance in sender terms.
        let before = if sender_high { -stored } else { stored };
        let after = before - amount.value();

        trace!(%sender, %receiver, before, after, "ripple_credit");

        let flags = line.flags();
        let sender_reserve =
            line_flags::sided(sender_high, line_flags::LOW_RESERVE, line_flags::HIGH_RESERVE);
        let sender_no_ripple = line_flags::sided(
            sender_high,
            line_flags::LOW_NO_RIPPLE,
            line_flags::HIGH_NO_RIPPLE,
        );
        let sender_freeze =
            line_flags::sided(sender_high, line_flags::LOW_FREEZE, line_flags::HIGH_FREEZE);
        let sender_limit = if sender_high {
            FieldId::HighLimit
        } else {
            FieldId::LowLimit
        };
        let sender_quality_in = if sender_high {
            FieldId::HighQualityIn
        } else {
            FieldId::LowQualityIn
        };
        let sender_quality_out = if sender_high {
            FieldId::HighQualityOut
        } else {
            FieldId::LowQualityOut
        };

        let mut delete = false;
        if before > 0
            && after <= 0
            && flags & sender_reserve != 0
            && flags & sender_no_ripple == 0
            && flags & sender_freeze == 0
            && line
                .field_amount(sender_limit)
                .map(|a| a.is_zero())
                .unwrap_or(true)
            && line.field_u32(sender_quality_in) == 0
            && line.field_u32(sender_quality_out) == 0
        {
            // The sender's side no longer justifies a reserve.
            self.decrement_owner_count(sender)?;
            line.clear_flag(sender_reserve);

            let receiver_reserve = line_flags::sided(
                !sender_high,
                line_flags::LOW_RESERVE,
                line_flags::HIGH_RESERVE,
            );
            delete = after == 0 && line.flags() & receiver_reserve == 0;
        }

        // Reflect the new balance even when the line is about to go.
        let stored_after = if sender_high { -after } else { after };
        let issue = line
            .field_amount(FieldId::Balance)
            .map(|a| a.issue())
            .unwrap_or_else(|| freshet_common::Issue::new(currency, AccountId::ZERO));
        line.set_field_amount(FieldId::Balance, Amount::new(stored_after, issue));

        if delete {
            let (low, high) = if sender_high {
                (receiver, sender)
            } else {
                (sender, receiver)
            };
            self.trust_delete(&line, low, high)
        } else {
            self.entry_modify(&line)
        }
    }

    /// Send IOUs regardless of trust limits, routing through the issuer
    /// when neither endpoint is the issuer and charging the transit fee.
    ///
    /// Returns the amount the sender actually paid (`amount` plus any
    /// transit fee).
    pub fn ripple_send(
        &mut self,
        sender: AccountId,
        receiver: AccountId,
        amount: Amount,
    ) -> TerResult<Amount> {
        let issuer = amount.issuer();

        debug_assert!(!amount.is_native());
        debug_assert!(sender != receiver);

        if sender == issuer || receiver == issuer || issuer.is_zero() {
            // Direct send: redeeming IOUs and/or sending own IOUs. The
            // credit outcome is deliberately not surfaced here.
            if let Err(err) = self.ripple_credit(sender, receiver, amount, false) {
                debug!(%err, "ripple_send: direct credit outcome discarded");
            }
            return Ok(amount);
        }

        // Third-party transit.
        let transit_fee = self.transfer_fee(sender, receiver, issuer, amount)?;

        if !transit_fee.is_zero() {
            // A quarter of the transit fee is offered to the sender's
            // referee ancestry.
            let share = big_divide(
                transit_fee.value(),
                FEE_SHARE_RATE.0,
                FEE_SHARE_RATE.1,
                Rounding::Down,
            )
            .map_err(|err| {
                error!(%err, "fee share overflow");
                Ter::TefInternal
            })?;
            self.share_fee_with_referee(sender, issuer, transit_fee.with_value(share))?;
        }

        let actual = if transit_fee.is_zero() {
            amount
        } else {
            amount.with_value(amount.value() + transit_fee.value())
        };
        let actual = actual.with_issuer(issuer);

        debug!(%sender, %receiver, deliver = %amount, fee = %transit_fee, cost = %actual, "ripple_send");

        self.ripple_credit(issuer, receiver, amount, true)?;
        self.ripple_credit(sender, issuer, actual, true)?;

        Ok(actual)
    }

    /// Move value between two accounts: IOUs go through
    /// [`EntrySet::ripple_send`]; native amounts adjust the account-root
    /// balances directly.
    ///
    /// Either endpoint may be the null account (pathfinding uses
    /// one-sided adjustments); a missing side is simply skipped.
    pub fn account_send(
        &mut self,
        sender: AccountId,
        receiver: AccountId,
        amount: Amount,
    ) -> TerResult<()> {
        debug_assert!(!amount.is_negative());

        if amount.is_zero() || sender == receiver {
            return Ok(());
        }

        if !amount.is_native() {
            trace!(%sender, %receiver, %amount, "account_send: iou");
            self.ripple_send(sender, receiver, amount)?;
            return Ok(());
        }

        let balance_field = if amount.is_vbc() {
            FieldId::BalanceVBC
        } else {
            FieldId::Balance
        };

        let sender_root = if sender.is_zero() {
            None
        } else {
            self.entry_cache(EntryType::AccountRoot, index::account_index(sender))?
        };
        let receiver_root = if receiver.is_zero() {
            None
        } else {
            self.entry_cache(EntryType::AccountRoot, index::account_index(receiver))?
        };

        trace!(%sender, %receiver, %amount, "account_send: native");

        if let Some(mut root) = sender_root {
            let balance = root
                .field_amount(balance_field)
                .unwrap_or_else(|| amount.with_value(0));
            if balance.value() < amount.value() {
                return Err(if self.params().open_ledger {
                    Ter::TelFailedProcessing
                } else {
                    Ter::TecFailedProcessing
                });
            }
            root.set_field_amount(balance_field, balance.with_value(balance.value() - amount.value()));
            self.entry_modify(&root)?;
        }

        if let Some(mut root) = receiver_root {
            let balance = root
                .field_amount(balance_field)
                .unwrap_or_else(|| amount.with_value(0));
            let Some(credited) = balance.value().checked_add(amount.value()) else {
                error!(%receiver, "account_send: balance overflow");
                return Err(Ter::TefInternal);
            };
            root.set_field_amount(balance_field, balance.with_value(credited));
            self.entry_modify(&root)?;
        }

        Ok(())
    }
}
