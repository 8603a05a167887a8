//! Driver pipeline behavior: sequence, fee, signing authority, dispatch.

mod util;

use std::sync::Arc;

use freshet_common::{Amount, Ter};
use freshet_ledger::{account_flags, index, FieldId, Ledger};
use freshet_tx::{PubKey, Transaction, TransactionEngine, TxData, TxParams};
use util::{account, funded_ledger, funded_root};

fn payment(seq: u32, amount: i64) -> Transaction {
    Transaction::new(
        account(1),
        seq,
        Amount::drops(10),
        TxData::Payment {
            destination: account(2),
            amount: Amount::drops(amount),
        },
    )
}

fn engine_with(ledger: Ledger) -> TransactionEngine {
    TransactionEngine::new(Arc::new(ledger))
}

fn source_balance(engine: &TransactionEngine) -> i64 {
    engine
        .ledger()
        .account_root(account(1))
        .unwrap()
        .field_amount(FieldId::Balance)
        .unwrap()
        .value()
}

fn source_sequence(engine: &TransactionEngine) -> u32 {
    engine
        .ledger()
        .account_root(account(1))
        .unwrap()
        .field_u32(FieldId::Sequence)
}

#[test]
fn successful_payment_moves_funds_and_consumes_fee() {
    let mut engine = engine_with(funded_ledger(30, &[1, 2]));
    let tx = payment(1, 1_000_000);

    let outcome = engine.apply(&tx, TxParams::default(), 0);
    assert_eq!(outcome.result, Ter::TesSuccess);
    assert!(outcome.metadata.is_some());

    assert_eq!(source_balance(&engine), 10_000_000_000 - 1_000_000 - 10);
    assert_eq!(source_sequence(&engine), 2);
    let receiver = engine.ledger().account_root(account(2)).unwrap();
    assert_eq!(
        receiver.field_amount(FieldId::Balance).unwrap().value(),
        10_000_000_000 + 1_000_000
    );
    assert!(engine.has_applied(&tx.id()));
}

#[test]
fn future_sequence_is_retried_without_charging() {
    // Account sequence is 5; a transaction with sequence 7 waits.
    let mut ledger = Ledger::new(30);
    let mut root = funded_root(1, 10_000_000_000);
    root.set_field_u32(FieldId::Sequence, 5);
    ledger.insert_entry(root);
    ledger.insert_entry(funded_root(2, 10_000_000_000));
    let mut engine = engine_with(ledger);

    let outcome = engine.apply(&payment(7, 500), TxParams::default(), 0);
    assert_eq!(outcome.result, Ter::TerPreSeq);
    assert!(outcome.metadata.is_none());

    // Nothing was committed: fee unspent, sequence still 5.
    assert_eq!(source_balance(&engine), 10_000_000_000);
    assert_eq!(source_sequence(&engine), 5);
}

#[test]
fn past_sequence_distinguishes_replays() {
    let mut ledger = Ledger::new(30);
    let mut root = funded_root(1, 10_000_000_000);
    root.set_field_u32(FieldId::Sequence, 5);
    ledger.insert_entry(root);
    ledger.insert_entry(funded_root(2, 10_000_000_000));

    // The same transaction already included: reports as a replay.
    let stale = payment(3, 500);
    ledger.record_transaction(stale.id());
    let mut engine = engine_with(ledger.clone());
    assert_eq!(
        engine.apply(&stale, TxParams::default(), 0).result,
        Ter::TefAlready
    );

    // Not previously included: plain past-sequence failure.
    let other = payment(3, 501);
    let mut engine = engine_with(ledger);
    assert_eq!(
        engine.apply(&other, TxParams::default(), 0).result,
        Ter::TefPastSeq
    );
}

#[test]
fn claimed_failure_still_consumes_fee_and_sequence() {
    // Destination does not exist: tecNO_DST, but the fee and sequence are
    // burned and the transaction is persisted.
    let mut engine = engine_with(funded_ledger(30, &[1]));
    let tx = payment(1, 500);

    let outcome = engine.apply(&tx, TxParams::default(), 0);
    assert_eq!(outcome.result, Ter::TecNoDst);
    assert!(outcome.metadata.is_some());

    assert_eq!(source_balance(&engine), 10_000_000_000 - 10);
    assert_eq!(source_sequence(&engine), 2);
    assert!(engine.has_applied(&tx.id()));
}

#[test]
fn open_ledger_polices_fee_level() {
    let mut engine = engine_with(funded_ledger(30, &[1, 2]));
    let mut tx = payment(1, 500);
    tx.fee = Amount::drops(2);

    let open = TxParams {
        open_ledger: true,
        ..TxParams::default()
    };
    assert_eq!(engine.apply(&tx, open, 0).result, Ter::TelInsufFeeP);

    // A closed ledger accepts the underpayment.
    assert_eq!(engine.apply(&tx, TxParams::default(), 0).result, Ter::TesSuccess);
}

#[test]
fn fee_shortfall_zeroes_balance_on_closed_ledger() {
    let mut ledger = Ledger::new(30);
    ledger.insert_entry(funded_root(1, 6));
    ledger.insert_entry(funded_root(2, 10_000_000_000));
    let mut engine = engine_with(ledger);

    let outcome = engine.apply(&payment(1, 1), TxParams::default(), 0);
    assert_eq!(outcome.result, Ter::TecInsuffFee);
    // Whatever was there went to the fee.
    assert_eq!(source_balance(&engine), 0);
    assert_eq!(source_sequence(&engine), 2);
}

#[test]
fn master_key_can_be_disabled() {
    let mut ledger = funded_ledger(30, &[1, 2]);
    let mut root = ledger.account_root(account(1)).unwrap();
    root.set_flag(account_flags::DISABLE_MASTER);
    root.set_field_account(FieldId::RegularKey, account(7));
    ledger.insert_entry(root);
    let mut engine = engine_with(ledger);

    // Master signature is refused.
    let tx = payment(1, 500);
    assert_eq!(
        engine.apply(&tx, TxParams::default(), 0).result,
        Ter::TefMasterDisabled
    );

    // The regular key still works.
    let mut tx = payment(1, 500);
    tx.signing_key = PubKey::for_account(account(7));
    assert_eq!(engine.apply(&tx, TxParams::default(), 0).result, Ter::TesSuccess);
}

#[test]
fn wrong_signer_classification() {
    // With a regular key on file, an unknown signer is a retriable auth
    // failure; without one it is malformed.
    let mut ledger = funded_ledger(30, &[1, 2]);
    let mut root = ledger.account_root(account(1)).unwrap();
    root.set_field_account(FieldId::RegularKey, account(7));
    ledger.insert_entry(root);
    let mut engine = engine_with(ledger);

    let mut tx = payment(1, 500);
    tx.signing_key = PubKey::for_account(account(8));
    assert_eq!(engine.apply(&tx, TxParams::default(), 0).result, Ter::TefBadAuth);

    let mut engine = engine_with(funded_ledger(30, &[1, 2]));
    let mut tx = payment(1, 500);
    tx.signing_key = PubKey::for_account(account(8));
    assert_eq!(
        engine.apply(&tx, TxParams::default(), 0).result,
        Ter::TemBadAuthMaster
    );
}

#[test]
fn bad_signature_is_rejected_before_ledger_access() {
    let mut engine = engine_with(funded_ledger(30, &[1, 2]));
    let mut tx = payment(1, 500);
    tx.signature_valid = false;
    assert_eq!(engine.apply(&tx, TxParams::default(), 0).result, Ter::TemInvalid);

    // Unless verification is delegated upstream.
    let mut tx = payment(1, 500);
    tx.signature_valid = false;
    let no_check = TxParams {
        no_check_sign: true,
        ..TxParams::default()
    };
    assert_eq!(engine.apply(&tx, no_check, 0).result, Ter::TesSuccess);
}

#[test]
fn unknown_type_is_malformed() {
    let mut engine = engine_with(funded_ledger(30, &[1]));
    let tx = Transaction::new(account(1), 1, Amount::drops(10), TxData::Unknown);
    assert_eq!(engine.apply(&tx, TxParams::default(), 0).result, Ter::TemUnknown);
}

#[test]
fn missing_source_account_is_retriable() {
    let mut engine = engine_with(funded_ledger(30, &[2]));
    let tx = payment(1, 500);
    assert_eq!(engine.apply(&tx, TxParams::default(), 0).result, Ter::TerNoAccount);
}

#[test]
fn add_wallet_and_referee_round_trip() {
    let mut engine = engine_with(funded_ledger(30, &[1, 2]));

    // Fund a brand-new wallet from account 1.
    let tx = Transaction::new(
        account(1),
        1,
        Amount::drops(10),
        TxData::AddWallet {
            destination: account(6),
            amount: Amount::drops(1_000_000_000),
        },
    );
    assert_eq!(engine.apply(&tx, TxParams::default(), 0).result, Ter::TesSuccess);
    let new_root = engine.ledger().account_root(account(6)).unwrap();
    assert_eq!(
        new_root.field_amount(FieldId::Balance).unwrap().value(),
        1_000_000_000
    );

    // The new wallet names account 1 as its referee.
    let tx = Transaction::new(
        account(6),
        1,
        Amount::drops(10),
        TxData::AddReferee {
            referee: account(1),
        },
    );
    assert_eq!(engine.apply(&tx, TxParams::default(), 0).result, Ter::TesSuccess);
    let new_root = engine.ledger().account_root(account(6)).unwrap();
    assert_eq!(new_root.field_account(FieldId::Referee), account(1));

    // Naming one twice is redundant.
    let tx = Transaction::new(
        account(6),
        2,
        Amount::drops(10),
        TxData::AddReferee {
            referee: account(2),
        },
    );
    assert_eq!(
        engine.apply(&tx, TxParams::default(), 0).result,
        Ter::TemRedundant
    );
}

#[test]
fn offer_place_then_cancel() {
    let mut engine = engine_with(funded_ledger(30, &[1, 9]));

    let place = Transaction::new(
        account(1),
        1,
        Amount::drops(10),
        TxData::CreateOffer {
            taker_pays: Amount::new(100, util::usd(account(9))),
            taker_gets: Amount::drops(50),
            passive: false,
            sell: false,
        },
    );
    assert_eq!(engine.apply(&place, TxParams::default(), 0).result, Ter::TesSuccess);

    let offer_idx = index::offer_index(account(1), 1);
    assert!(engine.ledger().contains(&offer_idx));
    let root = engine.ledger().account_root(account(1)).unwrap();
    assert_eq!(root.field_u32(FieldId::OwnerCount), 1);

    let cancel = Transaction::new(
        account(1),
        2,
        Amount::drops(10),
        TxData::CancelOffer { offer_sequence: 1 },
    );
    assert_eq!(engine.apply(&cancel, TxParams::default(), 1).result, Ter::TesSuccess);

    assert!(!engine.ledger().contains(&offer_idx));
    let root = engine.ledger().account_root(account(1)).unwrap();
    assert_eq!(root.field_u32(FieldId::OwnerCount), 0);
}

#[test]
fn set_trust_creates_then_clears_the_line() {
    use freshet_ledger::EntryType;

    let mut engine = engine_with(funded_ledger(30, &[1, 2]));
    let currency = freshet_common::Currency::from_code("USD");
    let line_idx = index::line_index(account(1), account(2), currency);

    // Account 1 extends 100 USD of trust toward account 2.
    let extend = Transaction::new(
        account(1),
        1,
        Amount::drops(10),
        TxData::SetTrust {
            limit: Amount::new(100, util::usd(account(2))),
            quality_in: 0,
            quality_out: 0,
            set_auth: false,
            set_no_ripple: false,
            clear_no_ripple: false,
            set_freeze: false,
            clear_freeze: false,
        },
    );
    assert_eq!(engine.apply(&extend, TxParams::default(), 0).result, Ter::TesSuccess);

    let line = engine.ledger().get_entry(&line_idx).unwrap();
    assert_eq!(line.entry_type(), EntryType::RippleState);
    // The configuring account's side carries the limit, issued by itself.
    assert_eq!(
        line.field_amount(FieldId::LowLimit).unwrap().issuer(),
        account(1)
    );
    let root = engine.ledger().account_root(account(1)).unwrap();
    assert_eq!(root.field_u32(FieldId::OwnerCount), 1);

    // Resetting the limit to zero returns the side to default; with a
    // zero balance the whole line goes away.
    let clear = Transaction::new(
        account(1),
        2,
        Amount::drops(10),
        TxData::SetTrust {
            limit: Amount::new(0, util::usd(account(2))),
            quality_in: 0,
            quality_out: 0,
            set_auth: false,
            set_no_ripple: false,
            clear_no_ripple: false,
            set_freeze: false,
            clear_freeze: false,
        },
    );
    assert_eq!(engine.apply(&clear, TxParams::default(), 1).result, Ter::TesSuccess);

    assert!(!engine.ledger().contains(&line_idx));
    let root = engine.ledger().account_root(account(1)).unwrap();
    assert_eq!(root.field_u32(FieldId::OwnerCount), 0);

    // Clearing a line that does not exist is redundant.
    let again = Transaction::new(
        account(1),
        3,
        Amount::drops(10),
        TxData::SetTrust {
            limit: Amount::new(0, util::usd(account(2))),
            quality_in: 0,
            quality_out: 0,
            set_auth: false,
            set_no_ripple: false,
            clear_no_ripple: false,
            set_freeze: false,
            clear_freeze: false,
        },
    );
    assert_eq!(
        engine.apply(&again, TxParams::default(), 2).result,
        Ter::TecNoLineRedundant
    );
}

#[test]
fn ticket_lifecycle() {
    let mut engine = engine_with(funded_ledger(30, &[1]));

    let create = Transaction::new(
        account(1),
        1,
        Amount::drops(10),
        TxData::CreateTicket {
            target: None,
            expiration: None,
        },
    );
    assert_eq!(engine.apply(&create, TxParams::default(), 0).result, Ter::TesSuccess);

    let ticket_idx = index::ticket_index(account(1), 1);
    assert!(engine.ledger().contains(&ticket_idx));
    let root = engine.ledger().account_root(account(1)).unwrap();
    assert_eq!(root.field_u32(FieldId::OwnerCount), 1);

    let cancel = Transaction::new(
        account(1),
        2,
        Amount::drops(10),
        TxData::CancelTicket {
            ticket_id: ticket_idx,
        },
    );
    assert_eq!(engine.apply(&cancel, TxParams::default(), 1).result, Ter::TesSuccess);

    assert!(!engine.ledger().contains(&ticket_idx));
    let root = engine.ledger().account_root(account(1)).unwrap();
    assert_eq!(root.field_u32(FieldId::OwnerCount), 0);

    // Canceling twice reports the missing ticket.
    let cancel = Transaction::new(
        account(1),
        3,
        Amount::drops(10),
        TxData::CancelTicket {
            ticket_id: ticket_idx,
        },
    );
    assert_eq!(
        engine.apply(&cancel, TxParams::default(), 2).result,
        Ter::TefNoTicket
    );
}

#[test]
fn dividend_round_stamps_accounts() {
    use freshet_ledger::dividend_state;
    use freshet_tx::DividendKind;

    let mut engine = engine_with(funded_ledger(30, &[2]));
    let admin = TxParams {
        admin: true,
        ..TxParams::default()
    };
    let zero = freshet_common::AccountId::ZERO;

    let start = Transaction::new(
        zero,
        0,
        Amount::drops(0),
        TxData::Dividend {
            kind: DividendKind::Start {
                dividend_ledger: 29,
                dividend_coins: 1_000,
            },
        },
    );
    assert_eq!(engine.apply(&start, admin, 0).result, Ter::TesSuccess);

    let apply = Transaction::new(
        zero,
        0,
        Amount::drops(0),
        TxData::Dividend {
            kind: DividendKind::Apply {
                account: account(2),
                vsprd: 42,
            },
        },
    );
    assert_eq!(engine.apply(&apply, admin, 1).result, Ter::TesSuccess);

    let done = Transaction::new(
        zero,
        0,
        Amount::drops(0),
        TxData::Dividend {
            kind: DividendKind::Done,
        },
    );
    assert_eq!(engine.apply(&done, admin, 2).result, Ter::TesSuccess);

    let object = engine.ledger().dividend_object().unwrap();
    assert_eq!(object.field_u8(FieldId::DividendState), dividend_state::DONE);
    assert_eq!(object.field_u32(FieldId::DividendLedger), 29);

    let stamped = engine.ledger().account_root(account(2)).unwrap();
    assert_eq!(stamped.field_u32(FieldId::DividendLedger), 29);
    assert_eq!(stamped.field_u64(FieldId::DividendVSprd), 42);
}

#[test]
fn admin_types_require_admin_submission() {
    let mut engine = engine_with(funded_ledger(30, &[1]));
    let change = Transaction::new(
        freshet_common::AccountId::ZERO,
        0,
        Amount::drops(0),
        TxData::Change {
            base_fee: Some(12),
            reserve_base: None,
            reserve_increment: None,
            amendment: None,
        },
    );

    assert_eq!(
        engine.apply(&change, TxParams::default(), 0).result,
        Ter::TemInvalid
    );

    let admin = TxParams {
        admin: true,
        ..TxParams::default()
    };
    assert_eq!(engine.apply(&change, admin, 0).result, Ter::TesSuccess);
    let fees = engine.ledger().get_entry(&index::fee_index()).unwrap();
    assert_eq!(fees.field_u64(FieldId::BaseFee), 12);
}
