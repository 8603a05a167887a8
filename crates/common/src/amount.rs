//! Currency, issue, and amount types.
//!
//! An [`Amount`] couples a signed 64-bit value with the [`Issue`] it is
//! denominated in. Native currencies (XRP and VBC) live directly on account
//! roots; every other currency is an IOU issued by some account and held on
//! trust lines. Balance arithmetic happens on the raw `i64` values with
//! 128-bit intermediates where rate math is involved (see [`crate::math`]).

use crate::types::AccountId;
use std::fmt;

/// 160-bit currency code.
///
/// The all-zero code is native XRP. Standard three-letter codes occupy
/// bytes 12..15 of the code space; everything else is opaque.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Currency(pub [u8; 20]);

impl Currency {
    /// Native XRP (the all-zero code).
    pub const XRP: Self = Self([0u8; 20]);

    /// Create a currency from a standard three-letter ASCII code.
    pub fn from_code(code: &str) -> Self {
        let bytes = code.as_bytes();
        debug_assert!(bytes.len() == 3, "standard currency codes are 3 ASCII chars");
        let mut raw = [0u8; 20];
        raw[12..12 + bytes.len().min(3)].copy_from_slice(&bytes[..bytes.len().min(3)]);
        Self(raw)
    }

    /// The alternate native asset.
    pub fn vbc() -> Self {
        Self::from_code("VBC")
    }

    /// True for native XRP.
    pub fn is_xrp(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// True for the alternate native asset.
    pub fn is_vbc(&self) -> bool {
        *self == Self::vbc()
    }

    /// True for either native asset. Native balances live on account roots
    /// and never on trust lines.
    pub fn is_native(&self) -> bool {
        self.is_xrp() || self.is_vbc()
    }

    fn code_str(&self) -> Option<&str> {
        if self.is_xrp() {
            return Some("XRP");
        }
        let code = &self.0[12..15];
        if self.0[..12].iter().all(|&b| b == 0)
            && self.0[15..].iter().all(|&b| b == 0)
            && code.iter().all(|b| b.is_ascii_alphanumeric())
        {
            std::str::from_utf8(code).ok()
        } else {
            None
        }
    }
}

impl fmt::Debug for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code_str() {
            Some(code) => write!(f, "Currency({code})"),
            None => write!(f, "Currency({})", hex::encode(self.0)),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code_str() {
            Some(code) => f.write_str(code),
            None => f.write_str(&hex::encode(self.0)),
        }
    }
}

/// A currency together with its issuing account.
///
/// For native currencies the issuer is the null account.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Issue {
    pub currency: Currency,
    pub issuer: AccountId,
}

impl Issue {
    /// Native XRP.
    pub const XRP: Self = Self {
        currency: Currency::XRP,
        issuer: AccountId::ZERO,
    };

    /// Create an IOU issue.
    pub fn new(currency: Currency, issuer: AccountId) -> Self {
        Self { currency, issuer }
    }

    /// The alternate native asset.
    pub fn vbc() -> Self {
        Self {
            currency: Currency::vbc(),
            issuer: AccountId::ZERO,
        }
    }

    /// True for either native asset.
    pub fn is_native(&self) -> bool {
        self.currency.is_native()
    }
}

impl fmt::Debug for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.currency, self.issuer)
    }
}

/// A signed amount of a single issue.
///
/// The value is a plain `i64` in the issue's smallest unit (drops for the
/// native assets). Trust-line balances are stored in low-account terms and
/// negated into the perspective the caller needs, so amounts are routinely
/// negative.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Amount {
    value: i64,
    issue: Issue,
}

impl Amount {
    /// Create an amount.
    pub fn new(value: i64, issue: Issue) -> Self {
        Self { value, issue }
    }

    /// Native XRP drops.
    pub fn drops(value: i64) -> Self {
        Self::new(value, Issue::XRP)
    }

    /// The zero amount of the given issue.
    pub fn zeroed(issue: Issue) -> Self {
        Self::new(0, issue)
    }

    /// The raw value.
    pub fn value(&self) -> i64 {
        self.value
    }

    /// The issue this amount is denominated in.
    pub fn issue(&self) -> Issue {
        self.issue
    }

    /// The currency.
    pub fn currency(&self) -> Currency {
        self.issue.currency
    }

    /// The issuer.
    pub fn issuer(&self) -> AccountId {
        self.issue.issuer
    }

    /// Replace the value, keeping the issue.
    pub fn with_value(&self, value: i64) -> Self {
        Self::new(value, self.issue)
    }

    /// Replace the issuer, keeping currency and value.
    pub fn with_issuer(&self, issuer: AccountId) -> Self {
        Self::new(self.value, Issue::new(self.issue.currency, issuer))
    }

    /// Negated copy.
    pub fn negated(&self) -> Self {
        Self::new(-self.value, self.issue)
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    pub fn is_positive(&self) -> bool {
        self.value > 0
    }

    pub fn is_negative(&self) -> bool {
        self.value < 0
    }

    /// True for either native asset.
    pub fn is_native(&self) -> bool {
        self.issue.is_native()
    }

    /// True for the alternate native asset.
    pub fn is_vbc(&self) -> bool {
        self.issue.currency.is_vbc()
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.value, self.issue)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_native() {
            write!(f, "{} {}", self.value, self.issue.currency)
        } else {
            write!(f, "{} {}/{}", self.value, self.issue.currency, self.issue.issuer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_classification() {
        assert!(Currency::XRP.is_xrp());
        assert!(Currency::XRP.is_native());
        assert!(Currency::vbc().is_vbc());
        assert!(Currency::vbc().is_native());

        let usd = Currency::from_code("USD");
        assert!(!usd.is_native());
        assert_eq!(usd.to_string(), "USD");
    }

    #[test]
    fn vbc_is_not_xrp() {
        assert!(!Currency::vbc().is_xrp());
        assert_ne!(Currency::vbc(), Currency::XRP);
    }

    #[test]
    fn amount_perspective_flip() {
        let issuer = AccountId::from_bytes([9u8; 20]);
        let usd = Issue::new(Currency::from_code("USD"), issuer);
        let amount = Amount::new(42, usd);
        assert_eq!(amount.negated().value(), -42);
        assert_eq!(amount.negated().issue(), usd);
        assert!(amount.negated().is_negative());
    }

    #[test]
    fn issuer_scrub() {
        let issuer = AccountId::from_bytes([9u8; 20]);
        let amount = Amount::new(7, Issue::new(Currency::from_code("EUR"), issuer));
        let scrubbed = amount.with_issuer(AccountId::ZERO);
        assert_eq!(scrubbed.value(), 7);
        assert_eq!(scrubbed.issuer(), AccountId::ZERO);
        assert_eq!(scrubbed.currency(), Currency::from_code("EUR"));
    }
}
