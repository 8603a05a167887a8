//! Balance and funds queries.

use freshet_common::{AccountId, Amount, Currency, Issue, TerResult};
use freshet_ledger::{account_flags, index, line_flags, EntryType, FieldId};
use tracing::trace;

use crate::entry_set::EntrySet;

/// Whether frozen balances read as zero or at face value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreezeHandling {
    /// Report a frozen balance as zero spendable.
    ZeroIfFrozen,
    /// Report the balance regardless of freeze state.
    IgnoreFreeze,
}

impl EntrySet {
    /// How much of `issuer`'s `currency` IOUs `account` holds, in
    /// account-relative sign. May be negative (the account owes).
    pub fn ripple_holds(
        &mut self,
        account: AccountId,
        currency: Currency,
        issuer: AccountId,
        freeze: FreezeHandling,
    ) -> TerResult<Amount> {
        let issue = Issue::new(currency, issuer);
        let line = self.entry_cache(
            EntryType::RippleState,
            index::line_index(account, issuer, currency),
        )?;

        let Some(line) = line else {
            return Ok(Amount::zeroed(issue));
        };

        if freeze == FreezeHandling::ZeroIfFrozen && self.is_frozen(account, currency, issuer)? {
            return Ok(Amount::zeroed(issue));
        }

        let balance = line
            .field_amount(FieldId::Balance)
            .unwrap_or_else(|| Amount::zeroed(issue));
        // Stored in low terms; flip into the account's perspective.
        let balance = if account > issuer {
            balance.negated()
        } else {
            balance
        };
        Ok(balance.with_issuer(issuer))
    }

    /// The amount `account` can spend of `currency`/`issuer` without going
    /// into debt: for native assets the balance above the reserve, for
    /// IOUs the trust-line holding.
    pub fn account_holds(
        &mut self,
        account: AccountId,
        currency: Currency,
        issuer: AccountId,
        freeze: FreezeHandling,
    ) -> TerResult<Amount> {
        if !currency.is_native() {
            let amount = self.ripple_holds(account, currency, issuer, freeze)?;
            trace!(%account, %amount, "account_holds");
            return Ok(amount);
        }

        let vbc = currency.is_vbc();
        let issue = if vbc { Issue::vbc() } else { Issue::XRP };

        let Some(root) =
            self.entry_cache(EntryType::AccountRoot, index::account_index(account))?
        else {
            return Ok(Amount::zeroed(issue));
        };

        let reserve = self
            .ledger()
            .reserve(root.field_u32(FieldId::OwnerCount)) as i64;
        let balance = root
            .field_amount(if vbc {
                FieldId::BalanceVBC
            } else {
                FieldId::Balance
            })
            .map(|a| a.value())
            .unwrap_or(0);

        let spendable = if balance < reserve {
            0
        } else {
            balance - reserve
        };
        trace!(%account, balance, reserve, spendable, "account_holds");
        Ok(Amount::new(spendable, issue))
    }

    /// Funds available to `account` for the currency and issuer of
    /// `default_amount`. An issuer's own IOUs are unlimited: the default
    /// is returned unchanged.
    pub fn account_funds(
        &mut self,
        account: AccountId,
        default_amount: Amount,
        freeze: FreezeHandling,
    ) -> TerResult<Amount> {
        if !default_amount.is_native() && default_amount.issuer() == account {
            trace!(%account, "account_funds: self-funded");
            return Ok(default_amount);
        }
        self.account_holds(
            account,
            default_amount.currency(),
            default_amount.issuer(),
            freeze,
        )
    }

    /// Whether `issuer` has frozen all of its issues.
    pub fn is_global_frozen(&mut self, issuer: AccountId) -> TerResult<bool> {
        if !self.ledger().enforce_freeze() || issuer.is_zero() {
            return Ok(false);
        }
        let root = self.entry_cache(EntryType::AccountRoot, index::account_index(issuer))?;
        Ok(root.is_some_and(|r| r.is_flag(account_flags::GLOBAL_FREEZE)))
    }

    /// Whether `account` is barred from spending `currency`/`issuer`,
    /// either by a global freeze or by an issuer-side line freeze.
    pub fn is_frozen(
        &mut self,
        account: AccountId,
        currency: Currency,
        issuer: AccountId,
    ) -> TerResult<bool> {
        if !self.ledger().enforce_freeze() || currency.is_native() {
            return Ok(false);
        }

        let root = self.entry_cache(EntryType::AccountRoot, index::account_index(issuer))?;
        if root.is_some_and(|r| r.is_flag(account_flags::GLOBAL_FREEZE)) {
            return Ok(true);
        }

        if issuer != account {
            let line = self.entry_cache(
                EntryType::RippleState,
                index::line_index(account, issuer, currency),
            )?;
            if let Some(line) = line {
                let issuer_side_freeze = if issuer > account {
                    line_flags::HIGH_FREEZE
                } else {
                    line_flags::LOW_FREEZE
                };
                if line.is_flag(issuer_side_freeze) {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }
}
