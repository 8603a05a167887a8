//! Ticket lifecycle.
//!
//! A ticket reserves a future transaction slot. It is an owned entry:
//! creation links it into the owner directory and costs reserve; a
//! cancellation by the owner or the named target releases both.

use freshet_common::{Ter, TerResult};
use freshet_ledger::{index, owner_dir_describer, EntryType, FieldId};

use crate::frame::TxData;
use crate::transactor::Transactor;

pub fn apply_create(tr: &mut Transactor) -> TerResult<()> {
    let TxData::CreateTicket { target, expiration } = tr.tx.data else {
        return Err(Ter::TefInternal);
    };

    if let Some(expiration) = expiration {
        if expiration == 0 {
            return Err(Ter::TemBadExpiration);
        }
    }

    if let Some(target) = target {
        if target == tr.account_id {
            return Err(Ter::TemRedundant);
        }
        if tr
            .nodes
            .entry_cache(EntryType::AccountRoot, index::account_index(target))?
            .is_none()
        {
            return Err(Ter::TecNoDst);
        }
    }

    let account = tr.account_id;
    let source_root = tr.source_root()?;
    let owner_count = source_root.field_u32(FieldId::OwnerCount);
    let reserve = tr.nodes.ledger().reserve(owner_count + 1) as i64;
    let balance = source_root
        .field_amount(FieldId::Balance)
        .map(|a| a.value())
        .unwrap_or(0);
    if balance < reserve {
        return Err(Ter::TecInsufReserveLine);
    }

    let idx = index::ticket_index(account, tr.tx.sequence);
    let mut ticket = tr.nodes.entry_create(EntryType::Ticket, idx)?;
    ticket.set_field_account(FieldId::Account, account);
    ticket.set_field_u32(FieldId::Sequence, tr.tx.sequence);
    if let Some(target) = target {
        ticket.set_field_account(FieldId::Target, target);
    }
    if let Some(expiration) = expiration {
        ticket.set_field_u32(FieldId::Expiration, expiration);
    }

    let owner_node = tr
        .nodes
        .dir_add(index::owner_dir_index(account), idx, |page, is_root| {
            owner_dir_describer(page, is_root, account)
        })?;
    ticket.set_field_u64(FieldId::OwnerNode, owner_node);

    tr.nodes.increment_owner_count(account)?;
    tr.nodes.entry_modify(&ticket)
}

pub fn apply_cancel(tr: &mut Transactor) -> TerResult<()> {
    let TxData::CancelTicket { ticket_id } = tr.tx.data else {
        return Err(Ter::TefInternal);
    };

    let Some(ticket) = tr.nodes.entry_cache(EntryType::Ticket, ticket_id)? else {
        return Err(Ter::TefNoTicket);
    };

    let owner = ticket.field_account(FieldId::Account);
    let target = ticket.field_account(FieldId::Target);
    if tr.account_id != owner && tr.account_id != target {
        return Err(Ter::TecNoPermission);
    }

    let soft = !ticket.has_field(FieldId::OwnerNode);
    tr.nodes.dir_delete(
        false,
        ticket.field_u64(FieldId::OwnerNode),
        index::owner_dir_index(owner),
        ticket.index(),
        false,
        soft,
    )?;
    tr.nodes.decrement_owner_count(owner)?;
    tr.nodes.entry_delete(&ticket)
}
