//! Trust-line lifecycle: creation, credit, and auto-deletion.

mod util;

use freshet_common::{AccountId, Amount, Currency, Issue};
use freshet_ledger::{index, line_flags, EntryType, FieldId};
use freshet_tx::FreezeHandling;
use util::{account, funded_ledger, fresh_set, usd};

#[test]
fn trust_create_then_credit() {
    // Accounts A < B, issuer is B.
    let a = account(1);
    let b = account(2);
    let currency = Currency::from_code("USD");
    let idx = index::line_index(a, b, currency);

    let mut set = fresh_set(funded_ledger(3, &[1, 2]));
    set.trust_create(
        false,
        a,
        b,
        idx,
        a,
        false,
        false,
        false,
        Amount::zeroed(Issue::new(currency, AccountId::ZERO)),
        Amount::new(100, Issue::new(currency, b)),
        0,
        0,
    )
    .unwrap();

    set.ripple_credit(b, a, Amount::new(30, usd(b)), false)
        .unwrap();

    // Balance is stored in low (A) terms: A received 30.
    let (line, _) = set.get_entry(&idx).unwrap();
    assert_eq!(line.field_amount(FieldId::Balance).unwrap().value(), 30);

    let holds = set
        .account_holds(a, currency, b, FreezeHandling::IgnoreFreeze)
        .unwrap();
    assert_eq!(holds.value(), 30);
}

#[test]
fn zero_balance_default_line_is_auto_deleted() {
    // The line comes into existence through the credit itself, so the
    // receiver's side carries nothing but the automatic reserve flag.
    let a = account(1);
    let b = account(2);
    let currency = Currency::from_code("USD");
    let idx = index::line_index(a, b, currency);

    let mut set = fresh_set(funded_ledger(3, &[1, 2]));
    set.ripple_credit(b, a, Amount::new(30, usd(b)), false)
        .unwrap();
    let (root_a, _) = set.get_entry(&index::account_index(a)).unwrap();
    assert_eq!(root_a.field_u32(FieldId::OwnerCount), 1);

    // Return everything: the line drops back to its default state and is
    // deleted outright.
    set.ripple_credit(a, b, Amount::new(30, usd(b)), false)
        .unwrap();

    assert!(set
        .entry_cache(EntryType::RippleState, idx)
        .unwrap()
        .is_none());

    // Net owner counts are back where they started.
    let (root_a, _) = set.get_entry(&index::account_index(a)).unwrap();
    assert_eq!(root_a.field_u32(FieldId::OwnerCount), 0);
    let (root_b, _) = set.get_entry(&index::account_index(b)).unwrap();
    assert_eq!(root_b.field_u32(FieldId::OwnerCount), 0);
}

#[test]
fn funded_side_survives_round_trip() {
    // Same round trip, but the sender's side carries a real limit, so the
    // line must stay.
    let a = account(1);
    let b = account(2);
    let currency = Currency::from_code("USD");
    let idx = index::line_index(a, b, currency);

    let mut set = fresh_set(funded_ledger(3, &[1, 2]));
    set.trust_create(
        false,
        a,
        b,
        idx,
        a,
        false,
        false,
        false,
        Amount::zeroed(Issue::new(currency, AccountId::ZERO)),
        // Limit issued by the source: A's own side is configured.
        Amount::new(100, Issue::new(currency, a)),
        0,
        0,
    )
    .unwrap();

    set.ripple_credit(b, a, Amount::new(30, usd(b)), false)
        .unwrap();
    set.ripple_credit(a, b, Amount::new(30, usd(b)), false)
        .unwrap();

    let line = set.entry_cache(EntryType::RippleState, idx).unwrap();
    let line = line.expect("line with a configured side survives");
    assert_eq!(line.field_amount(FieldId::Balance).unwrap().value(), 0);
    assert!(line.is_flag(line_flags::LOW_RESERVE));
}

#[test]
fn set_side_truth_table() {
    // The configured side is src_high XOR (limit issuer == dst), covering
    // all four combinations.
    let currency = Currency::from_code("USD");
    let cases = [
        // (src, dst, limit issuer, expect high side set)
        (account(1), account(2), account(1), false),
        (account(1), account(2), account(2), true),
        (account(2), account(1), account(2), true),
        (account(2), account(1), account(1), false),
    ];

    for (src, dst, limit_issuer, expect_high) in cases {
        let mut set = fresh_set(funded_ledger(3, &[1, 2]));
        let idx = index::line_index(src, dst, currency);
        set.trust_create(
            src > dst,
            src,
            dst,
            idx,
            src,
            false,
            false,
            false,
            Amount::zeroed(Issue::new(currency, AccountId::ZERO)),
            Amount::new(77, Issue::new(currency, limit_issuer)),
            0,
            0,
        )
        .unwrap();

        let (line, _) = set.get_entry(&idx).unwrap();
        let (set_limit, other_limit, set_reserve) = if expect_high {
            (FieldId::HighLimit, FieldId::LowLimit, line_flags::HIGH_RESERVE)
        } else {
            (FieldId::LowLimit, FieldId::HighLimit, line_flags::LOW_RESERVE)
        };

        assert_eq!(
            line.field_amount(set_limit).unwrap().value(),
            77,
            "limit side for src={src:?} issuer={limit_issuer:?}"
        );
        assert_eq!(line.field_amount(other_limit).unwrap().value(), 0);
        assert!(line.is_flag(set_reserve));
    }
}
