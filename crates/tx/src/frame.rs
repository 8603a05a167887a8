//! The transaction frame.
//!
//! A [`Transaction`] wraps the fields the driver needs: source account,
//! sequence, fee, signing key, optional prior-state assertions, and a
//! per-type payload. Signature cryptography itself is external; the frame
//! carries the verifier's verdict and caches the known-good/known-bad
//! state the way relays do, so a transaction is never verified twice.

use std::cell::Cell;

use freshet_common::{sha512_half, AccountId, Amount, Hash256};

/// The signing public key of a frame, reduced to the account it controls.
///
/// Key recovery and signature verification belong to the external crypto
/// layer; by the time a frame reaches this engine, the only fact about
/// the key that matters is which account id it derives to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PubKey {
    account: AccountId,
}

impl PubKey {
    /// The key controlling `account` (its master key, or a regular key
    /// that has been resolved to its own derived id).
    pub fn for_account(account: AccountId) -> Self {
        Self { account }
    }

    /// The account id this key signs for.
    pub fn account_id(&self) -> AccountId {
        self.account
    }
}

/// Cached signature-verification state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigState {
    Unknown,
    Good,
    Bad,
}

/// Transaction type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TxType {
    Payment = 0,
    AddWallet = 2,
    SetAccount = 3,
    SetRegularKey = 5,
    CreateOffer = 7,
    CancelOffer = 8,
    CreateTicket = 10,
    CancelTicket = 11,
    SetTrust = 20,
    Change = 100,
    Dividend = 104,
    AddReferee = 105,
    Unknown = 0xffff,
}

/// Sub-operation of a dividend transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DividendKind {
    /// Open a dividend round.
    Start {
        dividend_ledger: u32,
        dividend_coins: u64,
    },
    /// Stamp one account's participation in the open round.
    Apply { account: AccountId, vsprd: u64 },
    /// Close the round; fee sharing reads the closed round.
    Done,
}

/// Per-type payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxData {
    Payment {
        destination: AccountId,
        amount: Amount,
    },
    SetTrust {
        limit: Amount,
        quality_in: u32,
        quality_out: u32,
        set_auth: bool,
        set_no_ripple: bool,
        clear_no_ripple: bool,
        set_freeze: bool,
        clear_freeze: bool,
    },
    CreateOffer {
        taker_pays: Amount,
        taker_gets: Amount,
        passive: bool,
        sell: bool,
    },
    CancelOffer {
        offer_sequence: u32,
    },
    SetAccount {
        set_flag: Option<u32>,
        clear_flag: Option<u32>,
        transfer_rate: Option<u32>,
    },
    SetRegularKey {
        regular_key: Option<AccountId>,
    },
    AddWallet {
        destination: AccountId,
        amount: Amount,
    },
    Change {
        base_fee: Option<u64>,
        reserve_base: Option<u32>,
        reserve_increment: Option<u32>,
        amendment: Option<Hash256>,
    },
    Dividend {
        kind: DividendKind,
    },
    CreateTicket {
        target: Option<AccountId>,
        expiration: Option<u32>,
    },
    CancelTicket {
        ticket_id: Hash256,
    },
    AddReferee {
        referee: AccountId,
    },
    /// A wire type this engine does not implement.
    Unknown,
}

impl TxData {
    pub fn tx_type(&self) -> TxType {
        match self {
            TxData::Payment { .. } => TxType::Payment,
            TxData::SetTrust { .. } => TxType::SetTrust,
            TxData::CreateOffer { .. } => TxType::CreateOffer,
            TxData::CancelOffer { .. } => TxType::CancelOffer,
            TxData::SetAccount { .. } => TxType::SetAccount,
            TxData::SetRegularKey { .. } => TxType::SetRegularKey,
            TxData::AddWallet { .. } => TxType::AddWallet,
            TxData::Change { .. } => TxType::Change,
            TxData::Dividend { .. } => TxType::Dividend,
            TxData::CreateTicket { .. } => TxType::CreateTicket,
            TxData::CancelTicket { .. } => TxType::CancelTicket,
            TxData::AddReferee { .. } => TxType::AddReferee,
            TxData::Unknown => TxType::Unknown,
        }
    }
}

/// A transaction as submitted for execution.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub account: AccountId,
    pub sequence: u32,
    pub fee: Amount,
    pub signing_key: PubKey,
    /// The external verifier's verdict for this frame's signature.
    pub signature_valid: bool,
    pub previous_txn_id: Option<Hash256>,
    pub account_txn_id: Option<Hash256>,
    pub last_ledger_sequence: Option<u32>,
    pub data: TxData,
    sig_state: Cell<SigState>,
}

impl Transaction {
    /// A well-formed frame with a signing key matching the source account
    /// and a valid signature; tests and builders adjust from here.
    pub fn new(account: AccountId, sequence: u32, fee: Amount, data: TxData) -> Self {
        Self {
            account,
            sequence,
            fee,
            signing_key: PubKey::for_account(account),
            signature_valid: true,
            previous_txn_id: None,
            account_txn_id: None,
            last_ledger_sequence: None,
            data,
            sig_state: Cell::new(SigState::Unknown),
        }
    }

    pub fn tx_type(&self) -> TxType {
        self.data.tx_type()
    }

    /// Content-derived transaction id.
    pub fn id(&self) -> Hash256 {
        let type_code = (self.tx_type() as u16).to_be_bytes();
        let sequence = self.sequence.to_be_bytes();
        let fee = self.fee.value().to_be_bytes();
        let payload = format!("{:?}", self.data);
        sha512_half(&[
            b"TXN\0",
            &type_code,
            self.account.as_bytes(),
            &sequence,
            &fee,
            self.signing_key.account_id().as_bytes(),
            payload.as_bytes(),
        ])
    }

    /// Cached verification state.
    pub fn sig_state(&self) -> SigState {
        self.sig_state.get()
    }

    pub fn set_sig_good(&self) {
        self.sig_state.set(SigState::Good);
    }

    pub fn set_sig_bad(&self) {
        self.sig_state.set(SigState::Bad);
    }

    /// Ask the external verifier for a verdict on this frame.
    pub fn check_sign(&self) -> bool {
        self.signature_valid
    }
}
