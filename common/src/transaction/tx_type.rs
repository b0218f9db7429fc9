use std::fmt;

use super::Field;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TxType {
    Payment = 0,
    AccountSet = 3,
    SetRegularKey = 5,
    OfferCreate = 7,
    OfferCancel = 8,
    SignerListSet = 12,
    TrustSet = 20,
}

impl TxType {
    pub const ALL: &'static [TxType] = &[
        TxType::Payment,
        TxType::AccountSet,
        TxType::SetRegularKey,
        TxType::OfferCreate,
        TxType::OfferCancel,
        TxType::SignerListSet,
        TxType::TrustSet,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TxType::Payment => "Payment",
            TxType::AccountSet => "AccountSet",
            TxType::SetRegularKey => "SetRegularKey",
            TxType::OfferCreate => "OfferCreate",
            TxType::OfferCancel => "OfferCancel",
            TxType::SignerListSet => "SignerListSet",
            TxType::TrustSet => "TrustSet",
        }
    }

    pub fn from_name(name: &str) -> Option<TxType> {
        TxType::ALL.iter().copied().find(|t| t.name() == name)
    }

    pub fn from_code(code: u16) -> Option<TxType> {
        TxType::ALL.iter().copied().find(|t| *t as u16 == code)
    }

    // Fields every transaction type requires
    pub fn common_required() -> &'static [Field] {
        &[
            Field::TransactionType,
            Field::Account,
            Field::Fee,
            Field::Sequence,
            Field::SigningPubKey,
        ]
    }

    pub fn common_optional() -> &'static [Field] {
        &[
            Field::Flags,
            Field::SourceTag,
            Field::LastLedgerSequence,
            Field::AccountTxnID,
            Field::TxnSignature,
        ]
    }

    pub fn required(&self) -> &'static [Field] {
        match self {
            TxType::Payment => &[Field::Destination, Field::Amount],
            TxType::AccountSet => &[],
            TxType::SetRegularKey => &[],
            TxType::OfferCreate => &[Field::TakerPays, Field::TakerGets],
            TxType::OfferCancel => &[Field::OfferSequence],
            TxType::SignerListSet => &[Field::SignerQuorum],
            TxType::TrustSet => &[Field::LimitAmount],
        }
    }

    pub fn optional(&self) -> &'static [Field] {
        match self {
            TxType::Payment => &[Field::SendMax, Field::DestinationTag],
            TxType::AccountSet => &[
                Field::SetFlag,
                Field::ClearFlag,
                Field::TransferRate,
                Field::Domain,
                Field::MessageKey,
                Field::EmailHash,
                Field::WalletLocator,
            ],
            TxType::SetRegularKey => &[Field::RegularKey],
            TxType::OfferCreate => &[Field::OfferSequence, Field::Expiration],
            TxType::OfferCancel => &[],
            TxType::SignerListSet => &[Field::SignerEntries],
            TxType::TrustSet => &[Field::QualityIn, Field::QualityOut],
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
