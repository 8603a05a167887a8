//! Issuer-mediated sends: transit fees and referee sharing.

mod util;

use freshet_common::protocol::MIN_VSPD_TO_GET_FEE_SHARE;
use freshet_common::{AccountId, Amount, Currency};
use freshet_ledger::{dividend_state, index, Entry, EntryType, FieldId};
use freshet_tx::FreezeHandling;
use util::{account, funded_ledger, fresh_set, usd};

const ISSUER: u8 = 9;
const SENDER: u8 = 1;
const RECEIVER: u8 = 5;

/// Ledger with issuer at 2% transfer rate, a closed dividend round, and a
/// referee chain sender -> P1 -> P2 -> P3 where all three ancestors
/// qualify.
fn transit_ledger() -> freshet_ledger::Ledger {
    let mut ledger = funded_ledger(60, &[SENDER, 2, 3, 4, RECEIVER, ISSUER]);

    let mut dividend = Entry::new(EntryType::DividendObject, index::dividend_index());
    dividend.set_field_u8(FieldId::DividendState, dividend_state::DONE);
    dividend.set_field_u32(FieldId::DividendLedger, 55);
    ledger.insert_entry(dividend);

    for seed in [SENDER, 2, 3] {
        let mut root = ledger.account_root(account(seed)).unwrap();
        root.set_field_account(FieldId::Referee, account(seed + 1));
        ledger.insert_entry(root);
    }
    for seed in [2u8, 3, 4] {
        let mut root = ledger.account_root(account(seed)).unwrap();
        root.set_field_u32(FieldId::DividendLedger, 55);
        root.set_field_u64(FieldId::DividendVSprd, MIN_VSPD_TO_GET_FEE_SHARE + 1);
        ledger.insert_entry(root);
    }

    let mut issuer_root = ledger.account_root(account(ISSUER)).unwrap();
    issuer_root.set_field_u32(FieldId::TransferRate, 1_020_000_000);
    ledger.insert_entry(issuer_root);

    ledger
}

fn holds(set: &mut freshet_tx::EntrySet, seed: u8) -> i64 {
    set.ripple_holds(
        account(seed),
        Currency::from_code("USD"),
        account(ISSUER),
        FreezeHandling::IgnoreFreeze,
    )
    .unwrap()
    .value()
}

#[test]
fn transit_fee_with_referee_share() {
    let mut set = fresh_set(transit_ledger());

    // Fund the sender with 5000 of the issuer's IOUs, then send 1000 to
    // the receiver at a 2% transfer rate.
    set.ripple_credit(
        account(ISSUER),
        account(SENDER),
        Amount::new(5_000, usd(account(ISSUER))),
        false,
    )
    .unwrap();

    let actual = set
        .ripple_send(
            account(SENDER),
            account(RECEIVER),
            Amount::new(1_000, usd(account(ISSUER))),
        )
        .unwrap();

    // The sender paid the amount plus the 20-unit transit fee.
    assert_eq!(actual.value(), 1_020);
    assert_eq!(holds(&mut set, SENDER), 5_000 - 1_020);
    assert_eq!(holds(&mut set, RECEIVER), 1_000);

    // The fee-share pool is 25% of 20 = 5; a fifth each to P1 and P2, and
    // P3 takes its fifth plus the two undistributed ones.
    assert_eq!(holds(&mut set, 2), 1);
    assert_eq!(holds(&mut set, 3), 1);
    assert_eq!(holds(&mut set, 4), 3);

    let takers: Vec<(AccountId, i64)> = set
        .meta()
        .fee_share_takers()
        .iter()
        .map(|taker| (taker.account, taker.amount.value()))
        .collect();
    assert_eq!(
        takers,
        vec![(account(2), 1), (account(3), 1), (account(4), 3)]
    );

    // Value conservation: of the 20-unit fee the issuer keeps 15, the
    // ancestors hold 5. Total outstanding IOUs shrink by exactly the
    // issuer's keep.
    let outstanding: i64 = [SENDER, RECEIVER, 2, 3, 4]
        .iter()
        .map(|&seed| holds(&mut set, seed))
        .sum();
    assert_eq!(outstanding, 5_000 - 15);
}

#[test]
fn no_referee_chain_leaves_fee_with_issuer() {
    let mut ledger = funded_ledger(60, &[SENDER, RECEIVER, ISSUER]);
    let mut issuer_root = ledger.account_root(account(ISSUER)).unwrap();
    issuer_root.set_field_u32(FieldId::TransferRate, 1_020_000_000);
    ledger.insert_entry(issuer_root);
    let mut set = fresh_set(ledger);

    set.ripple_credit(
        account(ISSUER),
        account(SENDER),
        Amount::new(5_000, usd(account(ISSUER))),
        false,
    )
    .unwrap();
    set.ripple_send(
        account(SENDER),
        account(RECEIVER),
        Amount::new(1_000, usd(account(ISSUER))),
    )
    .unwrap();

    // No dividend object at all: the whole fee stays with the issuer.
    assert!(set.meta().fee_share_takers().is_empty());
    let outstanding = holds(&mut set, SENDER) + holds(&mut set, RECEIVER);
    assert_eq!(outstanding, 5_000 - 20);
}

#[test]
fn send_to_issuer_charges_no_fee() {
    let mut set = fresh_set(transit_ledger());
    set.ripple_credit(
        account(ISSUER),
        account(SENDER),
        Amount::new(500, usd(account(ISSUER))),
        false,
    )
    .unwrap();

    let actual = set
        .ripple_send(
            account(SENDER),
            account(ISSUER),
            Amount::new(200, usd(account(ISSUER))),
        )
        .unwrap();

    assert_eq!(actual.value(), 200);
    assert_eq!(holds(&mut set, SENDER), 300);
    assert!(set.meta().fee_share_takers().is_empty());
}
