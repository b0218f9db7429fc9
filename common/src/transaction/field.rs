use std::cmp::Ordering;

/// Serialized type of a field; the numeric value is the wire type code.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FieldType {
    UInt16 = 1,
    UInt32 = 2,
    Hash128 = 4,
    Hash256 = 5,
    Amount = 6,
    Blob = 7,
    AccountId = 8,
    Object = 14,
    Array = 15,
}

macro_rules! fields {
    ($($name:ident: $json:literal, $kind:ident, $code:literal;)*) => {
        /// Every field a transaction object may carry.
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
        pub enum Field {
            $($name,)*
        }

        impl Field {
            pub const ALL: &'static [Field] = &[$(Field::$name,)*];

            pub fn json_name(&self) -> &'static str {
                match self {
                    $(Field::$name => $json,)*
                }
            }

            pub fn field_type(&self) -> FieldType {
                match self {
                    $(Field::$name => FieldType::$kind,)*
                }
            }

            pub fn code(&self) -> u8 {
                match self {
                    $(Field::$name => $code,)*
                }
            }

            pub fn from_json_name(name: &str) -> Option<Field> {
                match name {
                    $($json => Some(Field::$name),)*
                    _ => None,
                }
            }
        }
    };
}

fields! {
    TransactionType: "TransactionType", UInt16, 2;
    SignerWeight: "SignerWeight", UInt16, 3;
    Flags: "Flags", UInt32, 2;
    SourceTag: "SourceTag", UInt32, 3;
    Sequence: "Sequence", UInt32, 4;
    Expiration: "Expiration", UInt32, 10;
    TransferRate: "TransferRate", UInt32, 11;
    DestinationTag: "DestinationTag", UInt32, 14;
    QualityIn: "QualityIn", UInt32, 20;
    QualityOut: "QualityOut", UInt32, 21;
    OfferSequence: "OfferSequence", UInt32, 25;
    LastLedgerSequence: "LastLedgerSequence", UInt32, 27;
    SetFlag: "SetFlag", UInt32, 33;
    ClearFlag: "ClearFlag", UInt32, 34;
    SignerQuorum: "SignerQuorum", UInt32, 35;
    EmailHash: "EmailHash", Hash128, 1;
    WalletLocator: "WalletLocator", Hash256, 7;
    AccountTxnID: "AccountTxnID", Hash256, 9;
    Amount: "Amount", Amount, 1;
    LimitAmount: "LimitAmount", Amount, 3;
    TakerPays: "TakerPays", Amount, 4;
    TakerGets: "TakerGets", Amount, 5;
    Fee: "Fee", Amount, 8;
    SendMax: "SendMax", Amount, 9;
    MessageKey: "MessageKey", Blob, 2;
    SigningPubKey: "SigningPubKey", Blob, 3;
    TxnSignature: "TxnSignature", Blob, 4;
    Domain: "Domain", Blob, 7;
    Account: "Account", AccountId, 1;
    Destination: "Destination", AccountId, 3;
    RegularKey: "RegularKey", AccountId, 8;
    SignerEntry: "SignerEntry", Object, 11;
    SignerEntries: "SignerEntries", Array, 4;
}

impl Field {
    pub fn from_codes(type_code: u8, field_code: u8) -> Option<Field> {
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.field_type() as u8 == type_code && f.code() == field_code)
    }

    fn sort_key(&self) -> (u8, u8) {
        (self.field_type() as u8, self.code())
    }

    // Signatures never cover themselves
    pub fn is_signing_field(&self) -> bool {
        *self != Field::TxnSignature
    }
}

impl Ord for Field {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for Field {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
