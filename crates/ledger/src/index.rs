//! Deterministic index derivation.
//!
//! Every entry's 256-bit index is the sha512-half of a namespace tag
//! followed by the entry's identifying fields. The derivations are
//! protocol-fixed: all replicas must compute identical indexes.

use freshet_common::{sha512_half, AccountId, Currency, Hash256, Issue};

/// Namespace tags. Each entry family hashes under its own two-byte space so
/// indexes can never collide across families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
enum Space {
    Account = b'a' as u16,
    DirNode = b'd' as u16,
    Ripple = b'r' as u16,
    Offer = b'o' as u16,
    OwnerDir = b'O' as u16,
    BookDir = b'B' as u16,
    Ticket = b'T' as u16,
    Amendments = b'f' as u16,
    FeeSettings = b'e' as u16,
    Dividend = b'D' as u16,
    Generator = b'g' as u16,
    Nickname = b'n' as u16,
}

impl Space {
    fn tag(self) -> [u8; 2] {
        (self as u16).to_be_bytes()
    }
}

/// Index of an account's root entry.
pub fn account_index(account: AccountId) -> Hash256 {
    sha512_half(&[&Space::Account.tag(), account.as_bytes()])
}

/// Index of the trust line between two accounts for one currency.
///
/// The endpoints are ordered canonically (numerically smaller id first) so
/// both sides derive the same index.
pub fn line_index(a: AccountId, b: AccountId, currency: Currency) -> Hash256 {
    let (low, high) = if a < b { (a, b) } else { (b, a) };
    sha512_half(&[
        &Space::Ripple.tag(),
        low.as_bytes(),
        high.as_bytes(),
        &currency.0,
    ])
}

/// Index of an account's owner directory root.
pub fn owner_dir_index(account: AccountId) -> Hash256 {
    sha512_half(&[&Space::OwnerDir.tag(), account.as_bytes()])
}

/// Index of page `node` in the directory rooted at `root`.
///
/// Page zero *is* the root; later pages hash the root with the page number.
pub fn dir_page_index(root: Hash256, node: u64) -> Hash256 {
    if node == 0 {
        root
    } else {
        sha512_half(&[&Space::DirNode.tag(), root.as_bytes(), &node.to_be_bytes()])
    }
}

/// Index of an offer placed by `account` with the given sequence.
pub fn offer_index(account: AccountId, sequence: u32) -> Hash256 {
    sha512_half(&[
        &Space::Offer.tag(),
        account.as_bytes(),
        &sequence.to_be_bytes(),
    ])
}

/// Root index of the order-book directory for a taker-pays/taker-gets pair.
pub fn book_index(pays: Issue, gets: Issue) -> Hash256 {
    sha512_half(&[
        &Space::BookDir.tag(),
        &pays.currency.0,
        pays.issuer.as_bytes(),
        &gets.currency.0,
        gets.issuer.as_bytes(),
    ])
}

/// Index of a ticket created by `account` with the given sequence.
pub fn ticket_index(account: AccountId, sequence: u32) -> Hash256 {
    sha512_half(&[
        &Space::Ticket.tag(),
        account.as_bytes(),
        &sequence.to_be_bytes(),
    ])
}

/// Index of the amendments singleton.
pub fn amendments_index() -> Hash256 {
    sha512_half(&[&Space::Amendments.tag()])
}

/// Index of the fee-settings singleton.
pub fn fee_index() -> Hash256 {
    sha512_half(&[&Space::FeeSettings.tag()])
}

/// Index of the dividend-object singleton.
pub fn dividend_index() -> Hash256 {
    sha512_half(&[&Space::Dividend.tag()])
}

/// Index of an account's generator map.
pub fn generator_index(account: AccountId) -> Hash256 {
    sha512_half(&[&Space::Generator.tag(), account.as_bytes()])
}

/// Index of a nickname entry.
pub fn nickname_index(name: &[u8]) -> Hash256 {
    sha512_half(&[&Space::Nickname.tag(), name])
}
