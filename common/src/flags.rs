// Flag constants for ledger entries, AccountSet and transaction Flags fields

/// Ledger entry flags stored on account roots, trust lines and offers.
pub mod lsf {
    // Account root
    pub const PASSWORD_SPENT: u32 = 0x0001_0000;
    pub const REQUIRE_DEST_TAG: u32 = 0x0002_0000;
    pub const REQUIRE_AUTH: u32 = 0x0004_0000;
    pub const DISALLOW_XRP: u32 = 0x0008_0000;
    pub const DISABLE_MASTER: u32 = 0x0010_0000;
    pub const NO_FREEZE: u32 = 0x0020_0000;
    pub const GLOBAL_FREEZE: u32 = 0x0040_0000;
    pub const DEFAULT_TRACKABLE: u32 = 0x0080_0000;

    // Trust line
    pub const LOW_RESERVE: u32 = 0x0001_0000;
    pub const HIGH_RESERVE: u32 = 0x0002_0000;
    pub const LOW_AUTH: u32 = 0x0004_0000;
    pub const HIGH_AUTH: u32 = 0x0008_0000;
    pub const LOW_NO_TRACKABLE: u32 = 0x0010_0000;
    pub const HIGH_NO_TRACKABLE: u32 = 0x0020_0000;
    pub const LOW_FREEZE: u32 = 0x0040_0000;
    pub const HIGH_FREEZE: u32 = 0x0080_0000;

    // Offer
    pub const PASSIVE: u32 = 0x0001_0000;
    pub const SELL: u32 = 0x0002_0000;
}

/// AccountSet `SetFlag` / `ClearFlag` values.
pub mod asf {
    pub const REQUIRE_DEST: u32 = 1;
    pub const REQUIRE_AUTH: u32 = 2;
    pub const DISALLOW_XRP: u32 = 3;
    pub const DISABLE_MASTER: u32 = 4;
    pub const ACCOUNT_TXN_ID: u32 = 5;
    pub const NO_FREEZE: u32 = 6;
    pub const GLOBAL_FREEZE: u32 = 7;
    pub const DEFAULT_TRACKABLE: u32 = 8;

    /// The account root flag an `asf` value controls. `ACCOUNT_TXN_ID` is a
    /// field rather than a flag and has none.
    pub fn to_ledger_flag(flag: u32) -> Option<u32> {
        use super::lsf;
        match flag {
            REQUIRE_DEST => Some(lsf::REQUIRE_DEST_TAG),
            REQUIRE_AUTH => Some(lsf::REQUIRE_AUTH),
            DISALLOW_XRP => Some(lsf::DISALLOW_XRP),
            DISABLE_MASTER => Some(lsf::DISABLE_MASTER),
            NO_FREEZE => Some(lsf::NO_FREEZE),
            GLOBAL_FREEZE => Some(lsf::GLOBAL_FREEZE),
            DEFAULT_TRACKABLE => Some(lsf::DEFAULT_TRACKABLE),
            _ => None,
        }
    }
}

/// Transaction `Flags` bits.
pub mod tf {
    pub const FULLY_CANONICAL_SIG: u32 = 0x8000_0000;
    pub const UNIVERSAL: u32 = FULLY_CANONICAL_SIG;
    pub const UNIVERSAL_MASK: u32 = !UNIVERSAL;

    // AccountSet
    pub const REQUIRE_DEST_TAG: u32 = 0x0001_0000;
    pub const OPTIONAL_DEST_TAG: u32 = 0x0002_0000;
    pub const REQUIRE_AUTH: u32 = 0x0004_0000;
    pub const OPTIONAL_AUTH: u32 = 0x0008_0000;
    pub const DISALLOW_XRP: u32 = 0x0010_0000;
    pub const ALLOW_XRP: u32 = 0x0020_0000;
    pub const ACCOUNT_SET_MASK: u32 = !(UNIVERSAL
        | REQUIRE_DEST_TAG
        | OPTIONAL_DEST_TAG
        | REQUIRE_AUTH
        | OPTIONAL_AUTH
        | DISALLOW_XRP
        | ALLOW_XRP);

    // Payment
    pub const NO_TRACKABLE_DIRECT: u32 = 0x0001_0000;
    pub const PARTIAL_PAYMENT: u32 = 0x0002_0000;
    pub const LIMIT_QUALITY: u32 = 0x0004_0000;
    pub const PAYMENT_MASK: u32 = !(UNIVERSAL | PARTIAL_PAYMENT | LIMIT_QUALITY | NO_TRACKABLE_DIRECT);

    // TrustSet
    pub const SETF_AUTH: u32 = 0x0001_0000;
    pub const SET_NO_TRACKABLE: u32 = 0x0002_0000;
    pub const CLEAR_NO_TRACKABLE: u32 = 0x0004_0000;
    pub const SET_FREEZE: u32 = 0x0010_0000;
    pub const CLEAR_FREEZE: u32 = 0x0020_0000;
    pub const TRUST_SET_MASK: u32 =
        !(UNIVERSAL | SETF_AUTH | SET_NO_TRACKABLE | CLEAR_NO_TRACKABLE | SET_FREEZE | CLEAR_FREEZE);

    // OfferCreate
    pub const PASSIVE: u32 = 0x0001_0000;
    pub const IMMEDIATE_OR_CANCEL: u32 = 0x0002_0000;
    pub const FILL_OR_KILL: u32 = 0x0004_0000;
    pub const SELL: u32 = 0x0008_0000;
    pub const OFFER_CREATE_MASK: u32 =
        !(UNIVERSAL | PASSIVE | IMMEDIATE_OR_CANCEL | FILL_OR_KILL | SELL);
}
