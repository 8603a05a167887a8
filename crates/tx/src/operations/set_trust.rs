//! Trust-line configuration.
//!
//! Creates, adjusts, or clears the caller's side of a trust line. The
//! caller's side is the one matching its position in the canonical
//! low/high ordering; a side in its default state (zero limit, no
//! qualities, no flags) stops justifying a reserve, and a line whose both
//! sides are default with a zero balance is removed entirely.

use freshet_common::{Amount, Issue, Ter, TerResult};
use freshet_ledger::{account_flags, index, line_flags, EntryType, FieldId};

use crate::frame::TxData;
use crate::transactor::Transactor;

pub fn apply(tr: &mut Transactor) -> TerResult<()> {
    let TxData::SetTrust {
        limit,
        quality_in,
        quality_out,
        set_auth,
        set_no_ripple,
        clear_no_ripple,
        set_freeze,
        clear_freeze,
    } = tr.tx.data
    else {
        return Err(Ter::TefInternal);
    };

    let account = tr.account_id;
    let currency = limit.currency();
    let peer = limit.issuer();

    if currency.is_native() {
        return Err(Ter::TemBadCurrency);
    }
    if limit.is_negative() {
        return Err(Ter::TemBadLimit);
    }
    if peer.is_zero() {
        return Err(Ter::TemDstNeeded);
    }
    if peer == account {
        return Err(Ter::TemDstIsSrc);
    }
    if tr
        .nodes
        .entry_cache(EntryType::AccountRoot, index::account_index(peer))?
        .is_none()
    {
        return Err(Ter::TecNoDst);
    }

    let high = account > peer;
    let idx = index::line_index(account, peer, currency);
    let source_root = tr.source_root()?;
    // Accounts that renounced freezing cannot freeze lines.
    let can_freeze = !source_root.is_flag(account_flags::NO_FREEZE);

    // The stored limit names the configuring account as issuer.
    let our_limit = limit.with_issuer(account);

    let limit_field = if high {
        FieldId::HighLimit
    } else {
        FieldId::LowLimit
    };
    let quality_in_field = if high {
        FieldId::HighQualityIn
    } else {
        FieldId::LowQualityIn
    };
    let quality_out_field = if high {
        FieldId::HighQualityOut
    } else {
        FieldId::LowQualityOut
    };
    let reserve_flag = line_flags::sided(high, line_flags::LOW_RESERVE, line_flags::HIGH_RESERVE);
    let auth_flag = line_flags::sided(high, line_flags::LOW_AUTH, line_flags::HIGH_AUTH);
    let no_ripple_flag =
        line_flags::sided(high, line_flags::LOW_NO_RIPPLE, line_flags::HIGH_NO_RIPPLE);
    let freeze_flag = line_flags::sided(high, line_flags::LOW_FREEZE, line_flags::HIGH_FREEZE);

    let Some(mut line) = tr.nodes.entry_cache(EntryType::RippleState, idx)? else {
        // No line yet. Clearing a non-existent line changes nothing.
        if limit.is_zero()
            && quality_in == 0
            && quality_out == 0
            && !set_auth
            && !set_no_ripple
            && !(set_freeze && can_freeze)
        {
            return Err(Ter::TecNoLineRedundant);
        }

        // A new line costs reserve.
        let owner_count = source_root.field_u32(FieldId::OwnerCount);
        let reserve = tr.nodes.ledger().reserve(owner_count + 1) as i64;
        let balance = source_root
            .field_amount(FieldId::Balance)
            .map(|a| a.value())
            .unwrap_or(0);
        if balance < reserve {
            return Err(Ter::TecInsufReserveLine);
        }

        return tr.nodes.trust_create(
            high,
            account,
            peer,
            idx,
            account,
            set_auth,
            set_no_ripple,
            set_freeze && can_freeze,
            Amount::zeroed(Issue::new(currency, freshet_common::AccountId::ZERO)),
            our_limit,
            quality_in,
            quality_out,
        );
    };

    // Adjust the existing line's side.
    line.set_field_amount(limit_field, our_limit);

    if quality_in != 0 {
        line.set_field_u32(quality_in_field, quality_in);
    } else {
        line.clear_field(quality_in_field);
    }
    if quality_out != 0 {
        line.set_field_u32(quality_out_field, quality_out);
    } else {
        line.clear_field(quality_out_field);
    }

    if set_auth {
        line.set_flag(auth_flag);
    }
    if set_no_ripple {
        line.set_flag(no_ripple_flag);
    } else if clear_no_ripple {
        line.clear_flag(no_ripple_flag);
    }
    if set_freeze && can_freeze {
        line.set_flag(freeze_flag);
    } else if clear_freeze {
        line.clear_flag(freeze_flag);
    }

    // Reserve bookkeeping follows whether our side still carries anything.
    let side_default = limit.is_zero()
        && !line.has_field(quality_in_field)
        && !line.has_field(quality_out_field)
        && !line.is_flag(auth_flag | no_ripple_flag | freeze_flag);

    if !side_default && !line.is_flag(reserve_flag) {
        line.set_flag(reserve_flag);
        tr.nodes.increment_owner_count(account)?;
    } else if side_default && line.is_flag(reserve_flag) {
        line.clear_flag(reserve_flag);
        tr.nodes.decrement_owner_count(account)?;
    }

    let balance_zero = line
        .field_amount(FieldId::Balance)
        .map(|a| a.is_zero())
        .unwrap_or(true);
    if balance_zero
        && !line.is_flag(line_flags::LOW_RESERVE)
        && !line.is_flag(line_flags::HIGH_RESERVE)
    {
        let (low, high_account) = if high { (peer, account) } else { (account, peer) };
        return tr.nodes.trust_delete(&line, low, high_account);
    }

    tr.nodes.entry_modify(&line)
}
