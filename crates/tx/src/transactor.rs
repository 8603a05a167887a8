//! The transaction driver.
//!
//! One pipeline applies to every transaction type: validate the frame,
//! load the source account, check the sequence, charge the fee, check the
//! signing authority, persist the account, then dispatch to the type
//! handler. Administrative types (fee/amendment changes, dividend
//! processing) come from consensus rather than an account and take a
//! short path that skips the account machinery.

use freshet_common::{AccountId, Ter, TerResult};
use freshet_ledger::{account_flags, index, Entry, EntryType, FieldId};
use tracing::{debug, trace, warn};

use crate::entry_set::{EntrySet, TxParams};
use crate::frame::{SigState, Transaction, TxData, TxType};
use crate::operations;

/// Driver state for one transaction application.
pub struct Transactor<'a> {
    pub(crate) tx: &'a Transaction,
    pub(crate) params: TxParams,
    pub(crate) nodes: &'a mut EntrySet,
    pub(crate) account_id: AccountId,
    pub(crate) account: Option<Entry>,
    pub(crate) source_balance: i64,
    pub(crate) has_auth_key: bool,
    pub(crate) sig_master: bool,
    pub(crate) fee_due: u64,
}

impl<'a> Transactor<'a> {
    /// Apply `tx` against the delta-set, returning the outcome code.
    pub fn apply(tx: &'a Transaction, nodes: &'a mut EntrySet) -> Ter {
        let params = nodes.params();
        let mut transactor = Self {
            tx,
            params,
            nodes,
            account_id: AccountId::ZERO,
            account: None,
            source_balance: 0,
            has_auth_key: false,
            sig_master: false,
            fee_due: 0,
        };
        match transactor.apply_inner() {
            Ok(()) => Ter::TesSuccess,
            Err(ter) => ter,
        }
    }

    /// Consume the sequence and fee of a transaction whose handler failed
    /// with a claimed (`tec`) outcome. Run against a fresh delta-set.
    pub fn claim_fee(tx: &'a Transaction, nodes: &'a mut EntrySet) -> TerResult<()> {
        let Some(mut account) =
            nodes.entry_cache(EntryType::AccountRoot, index::account_index(tx.account))?
        else {
            return Err(Ter::TerNoAccount);
        };

        let balance = account
            .field_amount(FieldId::Balance)
            .map(|a| a.value())
            .unwrap_or(0);
        let charge = tx.fee.value().min(balance).max(0);
        account.set_field_amount(FieldId::Balance, tx.fee.with_value(balance - charge));
        account.set_field_u32(FieldId::Sequence, tx.sequence + 1);
        if account.has_field(FieldId::AccountTxnId) {
            account.set_field_hash(FieldId::AccountTxnId, tx.id());
        }
        nodes.entry_modify(&account)
    }

    fn apply_inner(&mut self) -> TerResult<()> {
        trace!(tx_type = ?self.tx.tx_type(), "applying transaction");

        if matches!(self.tx.data, TxData::Change { .. } | TxData::Dividend { .. }) {
            return self.apply_admin();
        }

        self.pre_check()?;

        self.account = self
            .nodes
            .entry_cache(EntryType::AccountRoot, index::account_index(self.account_id))?;
        self.calculate_fee();

        let Some(account) = &self.account else {
            debug!(account = %self.account_id, "source account does not exist");
            return Err(Ter::TerNoAccount);
        };
        self.source_balance = account
            .field_amount(FieldId::Balance)
            .map(|a| a.value())
            .unwrap_or(0);
        self.has_auth_key = account.has_field(FieldId::RegularKey);

        self.check_seq()?;
        self.pay_fee()?;
        self.check_sig()?;

        if let Some(account) = self.account.take() {
            self.nodes.entry_modify(&account)?;
            self.account = Some(account);
        }

        self.dispatch()
    }

    /// Consensus-originated maintenance: no source account, no fee, no
    /// signature; only accepted from an administrative submission with a
    /// null source.
    fn apply_admin(&mut self) -> TerResult<()> {
        if !self.params.admin {
            warn!("administrative transaction from non-admin source");
            return Err(Ter::TemInvalid);
        }
        if !self.tx.account.is_zero() {
            return Err(Ter::TemBadSrcAccount);
        }
        self.dispatch()
    }

    /// Frame-level checks that need no ledger state.
    fn pre_check(&mut self) -> TerResult<()> {
        self.account_id = self.tx.account;
        if self.account_id.is_zero() {
            warn!("bad transaction source id");
            return Err(Ter::TemBadSrcAccount);
        }

        if self.tx.sig_state() != SigState::Good {
            let bad = self.tx.sig_state() == SigState::Bad
                || (!self.params.no_check_sign && !self.tx.check_sign());
            if bad {
                self.tx.set_sig_bad();
                warn!("invalid transaction (bad signature)");
                return Err(Ter::TemInvalid);
            }
            self.tx.set_sig_good();
        }

        Ok(())
    }

    fn calculate_fee(&mut self) {
        let base_fee = self.nodes.ledger().fees().base_fee;
        self.fee_due = self.nodes.ledger().scale_fee_load(base_fee, self.params.admin);
    }

    /// Sequence and prior-state assertions; consumes the sequence number
    /// on success.
    fn check_seq(&mut self) -> TerResult<()> {
        let Some(account) = &mut self.account else {
            return Ok(());
        };

        let t_seq = self.tx.sequence;
        let a_seq = account.field_u32(FieldId::Sequence);
        trace!(a_seq, t_seq, "check_seq");

        if t_seq != a_seq {
            if a_seq < t_seq {
                debug!("transaction has future sequence number");
                return Err(Ter::TerPreSeq);
            }
            if self.nodes.ledger().has_transaction(&self.tx.id()) {
                return Err(Ter::TefAlready);
            }
            warn!("transaction has past sequence number");
            return Err(Ter::TefPastSeq);
        }

        if let Some(expected) = self.tx.previous_txn_id {
            if account.field_hash(FieldId::PreviousTxnId) != expected {
                return Err(Ter::TefWrongPrior);
            }
        }
        if let Some(expected) = self.tx.account_txn_id {
            if account.field_hash(FieldId::AccountTxnId) != expected {
                return Err(Ter::TefWrongPrior);
            }
        }
        if let Some(last) = self.tx.last_ledger_sequence {
            if self.nodes.ledger().sequence() > last {
                return Err(Ter::TefMaxLedger);
            }
        }

        account.set_field_u32(FieldId::Sequence, t_seq + 1);
        if account.has_field(FieldId::AccountTxnId) {
            account.set_field_hash(FieldId::AccountTxnId, self.tx.id());
        }

        Ok(())
    }

    /// Charge the transaction fee against the source's native balance.
    fn pay_fee(&mut self) -> TerResult<()> {
        let paid = self.tx.fee;

        if !paid.is_native() || paid.is_vbc() || paid.is_negative() {
            return Err(Ter::TemBadFee);
        }

        // Underpayment is only policed while proposing; a closed ledger
        // already committed to including the transaction.
        if self.params.open_ledger && (paid.value() as u64) < self.fee_due {
            debug!(paid = paid.value(), due = self.fee_due, "insufficient fee paid");
            return Err(Ter::TelInsufFeeP);
        }

        if paid.is_zero() {
            return Ok(());
        }

        let Some(account) = &mut self.account else {
            return Ok(());
        };

        if self.source_balance < paid.value() {
            debug!(
                balance = self.source_balance,
                paid = paid.value(),
                "insufficient balance for fee"
            );
            if self.source_balance > 0 && !self.params.open_ledger {
                // Closed ledger: consume what is there and record the
                // failure.
                self.source_balance = 0;
                account.set_field_amount(FieldId::Balance, paid.with_value(0));
                return Err(Ter::TecInsuffFee);
            }
            return Err(Ter::TerInsufFeeB);
        }

        // Deduct now so the fee is not spendable during the transaction;
        // the account is only written back if the checks pass.
        self.source_balance -= paid.value();
        account.set_field_amount(FieldId::Balance, paid.with_value(self.source_balance));

        Ok(())
    }

    /// Verify the signer is authorized for the source account.
    fn check_sig(&mut self) -> TerResult<()> {
        let Some(account) = &self.account else {
            return Ok(());
        };
        let signer = self.tx.signing_key.account_id();

        if signer == self.account_id {
            self.sig_master = true;
            if account.is_flag(account_flags::DISABLE_MASTER) {
                return Err(Ter::TefMasterDisabled);
            }
            return Ok(());
        }

        if self.has_auth_key && signer == account.field_account(FieldId::RegularKey) {
            return Ok(());
        }

        if self.has_auth_key {
            debug!("delay: not authorized to use account");
            return Err(Ter::TefBadAuth);
        }

        debug!("invalid: not authorized to use account");
        Err(Ter::TemBadAuthMaster)
    }

    fn dispatch(&mut self) -> TerResult<()> {
        match self.tx.tx_type() {
            TxType::Payment => operations::payment::apply(self),
            TxType::SetTrust => operations::set_trust::apply(self),
            TxType::CreateOffer => operations::create_offer::apply(self),
            TxType::CancelOffer => operations::cancel_offer::apply(self),
            TxType::SetAccount => operations::set_account::apply(self),
            TxType::SetRegularKey => operations::set_regular_key::apply(self),
            TxType::AddWallet => operations::add_wallet::apply(self),
            TxType::Change => operations::change::apply(self),
            TxType::Dividend => operations::dividend::apply(self),
            TxType::CreateTicket => operations::tickets::apply_create(self),
            TxType::CancelTicket => operations::tickets::apply_cancel(self),
            TxType::AddReferee => operations::add_referee::apply(self),
            TxType::Unknown => Err(Ter::TemUnknown),
        }
    }

    // Accessors for the type handlers.

    pub(crate) fn source_root(&mut self) -> TerResult<Entry> {
        match self
            .nodes
            .entry_cache(EntryType::AccountRoot, index::account_index(self.account_id))?
        {
            Some(root) => Ok(root),
            None => Err(Ter::TefInternal),
        }
    }
}
