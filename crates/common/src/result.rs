//! Transaction result codes.
//!
//! Every mutating ledger operation reports its outcome as a [`Ter`] value.
//! The taxonomy is closed and category-ranged on the wire:
//!
//! - `tel` (-399..-300): local failure, the transaction is not relayed and
//!   may succeed if resubmitted later;
//! - `tem` (-299..-200): malformed, can never succeed;
//! - `tef` (-199..-100): cannot be included in this ledger line;
//! - `ter` (-99..-1): retry, could succeed in a later ledger;
//! - `tes` (0): success;
//! - `tec` (100..): failure recorded in consensus — the fee is claimed and
//!   the sequence consumed.
//!
//! Code is written against the enum, never against the integer ranges; the
//! numeric values only matter to the wire encoding.

use std::fmt;

/// Outcome category, derived from the wire range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerCategory {
    /// `tel` — local error.
    Local,
    /// `tem` — malformed.
    Malformed,
    /// `tef` — failure to include.
    Failure,
    /// `ter` — retry later.
    Retry,
    /// `tes` — success.
    Success,
    /// `tec` — claimed-fee failure, persisted by consensus.
    Claimed,
}

/// Transaction engine result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ter {
    // tel: local failures.
    TelFailedProcessing,
    TelInsufFeeP,

    // tem: malformed transactions.
    TemBadAmount,
    TemBadAuthMaster,
    TemBadCurrency,
    TemBadExpiration,
    TemBadFee,
    TemBadLimit,
    TemBadOffer,
    TemBadSequence,
    TemBadSrcAccount,
    TemBadTransferRate,
    TemDstIsSrc,
    TemDstNeeded,
    TemInvalid,
    TemRedundant,
    TemUnknown,

    // tef: failed to apply against this ledger line.
    TefAlready,
    TefBadAuth,
    TefBadLedger,
    TefCreated,
    TefInternal,
    TefMasterDisabled,
    TefMaxLedger,
    TefNoTicket,
    TefPastSeq,
    TefWrongPrior,

    // ter: retry later.
    TerInsufFeeB,
    TerNoAccount,
    TerPreSeq,

    // tes: success.
    TesSuccess,

    // tec: fee claimed, failure persisted.
    TecClaim,
    TecUnfundedOffer,
    TecUnfundedPayment,
    TecFailedProcessing,
    TecDirFull,
    TecInsufReserveLine,
    TecInsufReserveOffer,
    TecNoDst,
    TecNoLineRedundant,
    TecOwners,
    TecNoIssuer,
    TecNoAuth,
    TecNoLine,
    TecInsuffFee,
    TecFrozen,
    TecNoPermission,
    TecNeedMasterKey,
}

impl Ter {
    /// Wire code. The categories occupy disjoint integer ranges.
    pub fn code(&self) -> i32 {
        use Ter::*;
        match self {
            TelFailedProcessing => -395,
            TelInsufFeeP => -394,

            TemBadAmount => -298,
            TemBadAuthMaster => -297,
            TemBadCurrency => -296,
            TemBadExpiration => -295,
            TemBadFee => -294,
            TemBadLimit => -293,
            TemBadOffer => -292,
            TemBadSequence => -291,
            TemBadSrcAccount => -290,
            TemBadTransferRate => -289,
            TemDstIsSrc => -288,
            TemDstNeeded => -287,
            TemInvalid => -286,
            TemRedundant => -285,
            TemUnknown => -284,

            TefAlready => -198,
            TefBadAuth => -197,
            TefBadLedger => -196,
            TefCreated => -195,
            TefInternal => -194,
            TefMasterDisabled => -193,
            TefMaxLedger => -192,
            TefNoTicket => -191,
            TefPastSeq => -190,
            TefWrongPrior => -189,

            TerInsufFeeB => -98,
            TerNoAccount => -97,
            TerPreSeq => -96,

            TesSuccess => 0,

            TecClaim => 100,
            TecUnfundedOffer => 103,
            TecUnfundedPayment => 104,
            TecFailedProcessing => 105,
            TecDirFull => 121,
            TecInsufReserveLine => 122,
            TecInsufReserveOffer => 123,
            TecNoDst => 124,
            TecNoLineRedundant => 127,
            TecOwners => 132,
            TecNoIssuer => 133,
            TecNoAuth => 134,
            TecNoLine => 135,
            TecInsuffFee => 136,
            TecFrozen => 137,
            TecNoPermission => 139,
            TecNeedMasterKey => 142,
        }
    }

    /// The category this code falls into.
    pub fn category(&self) -> TerCategory {
        match self.code() {
            c if c <= -300 => TerCategory::Local,
            c if c <= -200 => TerCategory::Malformed,
            c if c <= -100 => TerCategory::Failure,
            c if c < 0 => TerCategory::Retry,
            0 => TerCategory::Success,
            _ => TerCategory::Claimed,
        }
    }

    /// True for `tesSUCCESS`.
    pub fn is_success(&self) -> bool {
        matches!(self, Ter::TesSuccess)
    }

    /// True for `tec` codes: the failure is persisted, the fee claimed, and
    /// the account sequence consumed.
    pub fn is_claimed(&self) -> bool {
        self.category() == TerCategory::Claimed
    }

    /// True when the transaction consumes a sequence number and fee —
    /// success or any `tec` outcome.
    pub fn is_applied(&self) -> bool {
        self.is_success() || self.is_claimed()
    }

    /// True for `ter` codes.
    pub fn is_retry(&self) -> bool {
        self.category() == TerCategory::Retry
    }

    /// The canonical token, e.g. `tesSUCCESS`.
    pub fn token(&self) -> &'static str {
        use Ter::*;
        match self {
            TelFailedProcessing => "telFAILED_PROCESSING",
            TelInsufFeeP => "telINSUF_FEE_P",
            TemBadAmount => "temBAD_AMOUNT",
            TemBadAuthMaster => "temBAD_AUTH_MASTER",
            TemBadCurrency => "temBAD_CURRENCY",
            TemBadExpiration => "temBAD_EXPIRATION",
            TemBadFee => "temBAD_FEE",
            TemBadLimit => "temBAD_LIMIT",
            TemBadOffer => "temBAD_OFFER",
            TemBadSequence => "temBAD_SEQUENCE",
            TemBadSrcAccount => "temBAD_SRC_ACCOUNT",
            TemBadTransferRate => "temBAD_TRANSFER_RATE",
            TemDstIsSrc => "temDST_IS_SRC",
            TemDstNeeded => "temDST_NEEDED",
            TemInvalid => "temINVALID",
            TemRedundant => "temREDUNDANT",
            TemUnknown => "temUNKNOWN",
            TefAlready => "tefALREADY",
            TefBadAuth => "tefBAD_AUTH",
            TefBadLedger => "tefBAD_LEDGER",
            TefCreated => "tefCREATED",
            TefInternal => "tefINTERNAL",
            TefMasterDisabled => "tefMASTER_DISABLED",
            TefMaxLedger => "tefMAX_LEDGER",
            TefNoTicket => "tefNO_TICKET",
            TefPastSeq => "tefPAST_SEQ",
            TefWrongPrior => "tefWRONG_PRIOR",
            TerInsufFeeB => "terINSUF_FEE_B",
            TerNoAccount => "terNO_ACCOUNT",
            TerPreSeq => "terPRE_SEQ",
            TesSuccess => "tesSUCCESS",
            TecClaim => "tecCLAIM",
            TecUnfundedOffer => "tecUNFUNDED_OFFER",
            TecUnfundedPayment => "tecUNFUNDED_PAYMENT",
            TecFailedProcessing => "tecFAILED_PROCESSING",
            TecDirFull => "tecDIR_FULL",
            TecInsufReserveLine => "tecINSUF_RESERVE_LINE",
            TecInsufReserveOffer => "tecINSUF_RESERVE_OFFER",
            TecNoDst => "tecNO_DST",
            TecNoLineRedundant => "tecNO_LINE_REDUNDANT",
            TecOwners => "tecOWNERS",
            TecNoIssuer => "tecNO_ISSUER",
            TecNoAuth => "tecNO_AUTH",
            TecNoLine => "tecNO_LINE",
            TecInsuffFee => "tecINSUFF_FEE",
            TecFrozen => "tecFROZEN",
            TecNoPermission => "tecNO_PERMISSION",
            TecNeedMasterKey => "tecNEED_MASTER_KEY",
        }
    }
}

impl fmt::Display for Ter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl std::error::Error for Ter {}

/// Shorthand for the result type every transactional operation returns:
/// `Ok(..)` is the `tesSUCCESS` path, `Err(ter)` carries the first
/// non-success code encountered.
pub type TerResult<T> = Result<T, Ter>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_match_wire_ranges() {
        assert_eq!(Ter::TesSuccess.category(), TerCategory::Success);
        assert_eq!(Ter::TecDirFull.category(), TerCategory::Claimed);
        assert_eq!(Ter::TefPastSeq.category(), TerCategory::Failure);
        assert_eq!(Ter::TerPreSeq.category(), TerCategory::Retry);
        assert_eq!(Ter::TelInsufFeeP.category(), TerCategory::Local);
        assert_eq!(Ter::TemBadFee.category(), TerCategory::Malformed);
    }

    #[test]
    fn applied_means_fee_consumed() {
        assert!(Ter::TesSuccess.is_applied());
        assert!(Ter::TecInsuffFee.is_applied());
        assert!(!Ter::TerPreSeq.is_applied());
        assert!(!Ter::TefPastSeq.is_applied());
    }

    #[test]
    fn tokens_carry_category_prefix() {
        for ter in [
            Ter::TesSuccess,
            Ter::TecFailedProcessing,
            Ter::TefBadLedger,
            Ter::TelFailedProcessing,
            Ter::TemBadSrcAccount,
            Ter::TerNoAccount,
        ] {
            let prefix = &ter.token()[..3];
            let expected = match ter.category() {
                TerCategory::Local => "tel",
                TerCategory::Malformed => "tem",
                TerCategory::Failure => "tef",
                TerCategory::Retry => "ter",
                TerCategory::Success => "tes",
                TerCategory::Claimed => "tec",
            };
            assert_eq!(prefix, expected);
        }
    }
}
